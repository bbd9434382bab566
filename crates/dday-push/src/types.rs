use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One push notification, independent of its destination token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// FCM only accepts string values in the data payload.
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendRequest<'a> {
    pub message: WireMessage<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub token: &'a str,
    pub notification: WireNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Seconds until the token expires.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Claims of the JWT-bearer assertion sent to the token endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct AssertionClaims<'a> {
    pub iss: &'a str,
    pub scope: &'a str,
    pub aud: &'a str,
    pub iat: i64,
    pub exp: i64,
}

impl<'a> SendRequest<'a> {
    pub(crate) fn new(token: &'a str, message: &'a PushMessage) -> Self {
        Self {
            message: WireMessage {
                token,
                notification: WireNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: (!message.data.is_empty()).then_some(&message.data),
            },
        }
    }
}
