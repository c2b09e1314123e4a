//! On-disk cassette format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::http::{Authorization, HttpReply, HttpRequest, Method, RequestBody};

/// A recorded session: every HTTP exchange of one run, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Session name.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Git commit the recording was made from.
    pub commit: String,
    /// Recorded exchanges.
    pub interactions: Vec<Exchange>,
}

/// One request and what came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Position in the session.
    pub seq: u64,
    /// HTTP method.
    pub method: Method,
    /// Request URL.
    pub url: String,
    /// Authorization scheme, with the secret redacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Authorization>,
    /// Request body, for inspection only; replay ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    /// Outcome of the request.
    pub response: Outcome,
}

impl Exchange {
    /// Capture a request and its outcome, dropping the credential.
    #[must_use]
    pub fn capture(seq: u64, request: &HttpRequest, response: Outcome) -> Self {
        let body = match &request.body {
            RequestBody::Empty => None,
            other => Some(other.clone()),
        };
        Self {
            seq,
            method: request.method,
            url: request.url.clone(),
            auth: request.auth.as_ref().map(Authorization::redacted),
            body,
            response,
        }
    }
}

/// What a recorded request produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A response arrived.
    Reply(HttpReply),
    /// No response; the transport error message.
    Error(String),
}
