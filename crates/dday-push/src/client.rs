//! HTTP client for the Google OAuth token endpoint and the FCM v1 send API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};

use crate::credential::ServiceAccountKey;
use crate::error::PushError;
use crate::types::{AssertionClaims, PushMessage, SendRequest, SendResponse, TokenResponse};

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com/";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Client for the OAuth token exchange and FCM message sends.
///
/// Use [`PushClient::new`] in production or [`PushClient::with_endpoints`]
/// to point both endpoints at a mock server.
#[derive(Debug, Clone)]
pub struct PushClient {
    client: Client,
    token_url: Url,
    fcm_base_url: Url,
}

/// A short-lived bearer token for the FCM API.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// An authenticated sending context for one dispatch run.
#[derive(Debug, Clone)]
pub struct PushSession {
    client: PushClient,
    project_id: String,
    access_token: AccessToken,
}

impl PushClient {
    /// Creates a client pointed at the production Google endpoints.
    ///
    /// `timeout_secs` bounds every request, so a stuck send fails instead of
    /// stalling the run.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, PushError> {
        Self::with_endpoints(timeout_secs, DEFAULT_TOKEN_URL, DEFAULT_FCM_BASE_URL)
    }

    /// Creates a client with custom token and FCM base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PushError::InvalidUrl`] if either URL does not parse.
    pub fn with_endpoints(
        timeout_secs: u64,
        token_url: &str,
        fcm_base_url: &str,
    ) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent("dday/0.1 (reminder-dispatch)")
            .build()?;

        let token_url = Url::parse(token_url)
            .map_err(|e| PushError::InvalidUrl(format!("'{token_url}': {e}")))?;
        // Exactly one trailing slash so joins append instead of replacing the last segment.
        let normalised = format!("{}/", fcm_base_url.trim_end_matches('/'));
        let fcm_base_url = Url::parse(&normalised)
            .map_err(|e| PushError::InvalidUrl(format!("'{fcm_base_url}': {e}")))?;

        Ok(Self {
            client,
            token_url,
            fcm_base_url,
        })
    }

    /// Exchanges a signed service-account assertion for an access token.
    ///
    /// # Errors
    ///
    /// - [`PushError::Signing`] if the private key cannot sign the assertion.
    /// - [`PushError::Http`] on network failure.
    /// - [`PushError::TokenExchange`] on a non-2xx response.
    /// - [`PushError::Deserialize`] if the response is not a token payload.
    /// - [`PushError::InvalidTokenLifetime`] if `expires_in` cannot be turned
    ///   into a timestamp.
    pub async fn fetch_access_token(
        &self,
        key: &ServiceAccountKey,
    ) -> Result<AccessToken, PushError> {
        let assertion = self.sign_assertion(key, Utc::now().timestamp())?;

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PushError::TokenExchange {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| PushError::Deserialize {
                context: "token exchange response".to_string(),
                source: e,
            })?;

        let expires_at = chrono::Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(PushError::InvalidTokenLifetime(token.expires_in))?;
        let access_token = AccessToken {
            value: token.access_token,
            expires_at,
        };
        tracing::debug!(
            client_email = %key.client_email,
            expires_at = %access_token.expires_at,
            "obtained FCM access token"
        );
        Ok(access_token)
    }

    /// Authenticates once and returns a session bound to the key's project.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`PushClient::fetch_access_token`].
    pub async fn open_session(self, key: &ServiceAccountKey) -> Result<PushSession, PushError> {
        let access_token = self.fetch_access_token(key).await?;
        Ok(PushSession {
            client: self,
            project_id: key.project_id.clone(),
            access_token,
        })
    }

    fn sign_assertion(&self, key: &ServiceAccountKey, issued_at: i64) -> Result<String, PushError> {
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: MESSAGING_SCOPE,
            aud: self.token_url.as_str(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&key.private_key_id);

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem())?;
        Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
    }

    fn send_url(&self, project_id: &str) -> Result<Url, PushError> {
        self.fcm_base_url
            .join(&format!("v1/projects/{project_id}/messages:send"))
            .map_err(|e| PushError::InvalidUrl(format!("project '{project_id}': {e}")))
    }
}

impl PushSession {
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Sends one notification to one device token.
    ///
    /// Returns the FCM message name on success.
    ///
    /// # Errors
    ///
    /// - [`PushError::TokenExpired`] if the session outlived its access token.
    /// - [`PushError::Http`] on network failure or timeout.
    /// - [`PushError::Rejected`] when FCM answers with a non-2xx status.
    /// - [`PushError::Deserialize`] if a 2xx body is not a send response.
    pub async fn send(&self, device_token: &str, message: &PushMessage) -> Result<String, PushError> {
        if self.access_token.is_expired_at(Utc::now()) {
            return Err(PushError::TokenExpired(self.access_token.expires_at));
        }
        let url = self.client.send_url(&self.project_id)?;

        let response = self
            .client
            .client
            .post(url)
            .bearer_auth(&self.access_token.value)
            .json(&SendRequest::new(device_token, message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let sent: SendResponse = serde_json::from_str(&body).map_err(|e| PushError::Deserialize {
            context: "send response".to_string(),
            source: e,
        })?;
        Ok(sent.name)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
