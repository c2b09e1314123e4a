//! HTTP transport port: the single network boundary of the core.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
}

/// Value of the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    /// `Authorization: Key <credential>`, used by the queue and the initiate endpoints.
    Key(String),
    /// `Authorization: Bearer <credential>`, used by the legacy form endpoints.
    Bearer(String),
}

impl Authorization {
    /// Render the header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Key(k) => format!("Key {k}"),
            Self::Bearer(k) => format!("Bearer {k}"),
        }
    }

    /// Same scheme with the secret replaced, for cassettes and logs.
    #[must_use]
    pub fn redacted(&self) -> Self {
        match self {
            Self::Key(_) => Self::Key("<redacted>".into()),
            Self::Bearer(_) => Self::Bearer("<redacted>".into()),
        }
    }
}

/// One field of a multipart form body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormField {
    /// Plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File field.
    File {
        /// Field name.
        name: String,
        /// File name sent with the part.
        file_name: String,
        /// MIME type of the part.
        content_type: String,
        /// File contents.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON body.
    Json {
        /// The JSON document.
        value: serde_json::Value,
    },
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Value of the `Content-Type` header.
        content_type: String,
        /// Payload.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    /// `multipart/form-data` body.
    Multipart {
        /// Fields in send order.
        fields: Vec<FormField>,
    },
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Optional `Authorization` header.
    pub auth: Option<Authorization>,
    /// Request body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// A `GET` request without a body.
    #[must_use]
    pub fn get(url: impl Into<String>, auth: Option<Authorization>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            auth,
            body: RequestBody::Empty,
        }
    }

    /// A `POST` request with a JSON body.
    #[must_use]
    pub fn post_json(
        url: impl Into<String>,
        auth: Option<Authorization>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            auth,
            body: RequestBody::Json { value },
        }
    }

    /// A `POST` request with a multipart form body.
    #[must_use]
    pub fn post_form(
        url: impl Into<String>,
        auth: Option<Authorization>,
        fields: Vec<FormField>,
    ) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            auth,
            body: RequestBody::Multipart { fields },
        }
    }

    /// A `PUT` request with a raw byte body.
    #[must_use]
    pub fn put_bytes(
        url: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            auth: None,
            body: RequestBody::Bytes {
                content_type: content_type.into(),
                data,
            },
        }
    }
}

/// A received HTTP response: status plus the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    #[serde(with = "reply_body")]
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Build a reply from a status and a body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as (lossy) UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::MalformedResponse`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GenError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            GenError::MalformedResponse(format!(
                "{e} (status {}, body: {})",
                self.status,
                truncate(&self.text(), 200)
            ))
        })
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() > max {
        let cut = (0..=max)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}

/// Boxed future type returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpReply, GenError>> + Send + 'a>>;

/// Sends HTTP requests to the outside world.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; `Err` is reserved for requests that produced no response.
pub trait HttpTransport: Send + Sync {
    /// Send one request and collect the full response.
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_>;
}

/// Serde helper for serializing `Vec<u8>` as base64 strings in cassettes.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

/// Reply bodies are stored as plain text when they are UTF-8, so cassettes
/// stay readable, and as `{ base64: ... }` otherwise.
mod reply_body {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Text(String),
        Binary { base64: String },
    }

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(data) {
            Ok(text) => Stored::Text(text.to_string()),
            Err(_) => Stored::Binary {
                base64: base64::engine::general_purpose::STANDARD.encode(data),
            },
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Stored::deserialize(deserializer)? {
            Stored::Text(text) => Ok(text.into_bytes()),
            Stored::Binary { base64 } => base64::engine::general_purpose::STANDARD
                .decode(&base64)
                .map_err(serde::de::Error::custom),
        }
    }
}
