use thiserror::Error;

/// Errors talking to the OAuth token endpoint or the FCM send endpoint.
#[derive(Debug, Error)]
pub enum PushError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service-account assertion could not be signed.
    #[error("failed to sign service-account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The OAuth endpoint refused the assertion.
    #[error("token exchange rejected with HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },

    /// FCM refused the message (unregistered token, bad payload, quota, ...).
    #[error("message rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint returned an `expires_in` no timestamp can hold.
    #[error("token exchange returned an unusable lifetime of {0} seconds")]
    InvalidTokenLifetime(i64),

    /// The session's access token ran out before the send was attempted.
    #[error("FCM access token expired at {0}")]
    TokenExpired(chrono::DateTime<chrono::Utc>),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Problems with the service-account credential itself.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("service-account credential is not configured")]
    Missing,

    #[error("service-account credential is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("service-account credential has an empty `{0}` field")]
    EmptyField(&'static str),

    #[error("service-account `private_key` is not a PEM private key")]
    NotAPrivateKey,
}
