//! Firebase Cloud Messaging (HTTP v1) client used for reminder delivery.
//!
//! A run authenticates once with a service-account credential
//! ([`PushClient::open_session`]) and then sends every message through the
//! returned [`PushSession`].

pub mod client;
pub mod credential;
pub mod error;
pub mod types;

pub use client::{AccessToken, PushClient, PushSession};
pub use credential::ServiceAccountKey;
pub use error::{CredentialError, PushError};
pub use types::PushMessage;
