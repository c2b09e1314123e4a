//! Asset hosting through an ordered chain of upload endpoints.
//!
//! The storage API differs between deployments, so uploads walk a fixed list
//! of candidates and keep the first hosted URL. Individual candidate failures
//! are logged and skipped; only total exhaustion is reported, as
//! [`UploadResult::Failed`].

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::GenError;
use crate::ports::http::{Authorization, FormField, HttpRequest, HttpTransport};

/// Protocol spoken by an upload candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProtocol {
    /// `POST` an initiate descriptor, then `PUT` the bytes to the returned URL.
    TwoStage,
    /// Single multipart `POST`.
    FormData,
}

/// One endpoint in the upload chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    /// Endpoint URL.
    pub endpoint_url: String,
    /// Protocol to use against it.
    pub protocol: UploadProtocol,
}

impl UploadCandidate {
    /// A two-stage (initiate + PUT) candidate.
    pub fn two_stage(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: url.into(),
            protocol: UploadProtocol::TwoStage,
        }
    }

    /// A multipart form candidate.
    pub fn form_data(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: url.into(),
            protocol: UploadProtocol::FormData,
        }
    }
}

/// Outcome of [`AssetUploader::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// The payload is hosted at `url`.
    Hosted {
        /// Public URL of the uploaded file.
        url: String,
    },
    /// Every candidate failed.
    Failed,
}

impl UploadResult {
    /// Convert to a `Result`, for callers that refuse the inline fallback.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UploadExhausted`] for [`UploadResult::Failed`].
    pub fn into_hosted(self) -> Result<String, GenError> {
        match self {
            Self::Hosted { url } => Ok(url),
            Self::Failed => Err(GenError::UploadExhausted),
        }
    }
}

/// Response of an initiate endpoint. Deployments disagree on casing.
#[derive(Deserialize)]
struct InitiateResponse {
    upload_url: Option<String>,
    #[serde(rename = "uploadUrl")]
    upload_url_camel: Option<String>,
    file_url: Option<String>,
    #[serde(rename = "fileUrl")]
    file_url_camel: Option<String>,
    url: Option<String>,
}

impl InitiateResponse {
    fn into_urls(self) -> Option<(String, String)> {
        let upload = self.upload_url.or(self.upload_url_camel)?;
        let file = self.file_url.or(self.file_url_camel).or(self.url)?;
        Some((upload, file))
    }
}

/// Response of a legacy form endpoint.
#[derive(Deserialize)]
struct FormUploadResponse {
    url: Option<String>,
    file_url: Option<String>,
    #[serde(rename = "fileUrl")]
    file_url_camel: Option<String>,
}

impl FormUploadResponse {
    fn into_url(self) -> Option<String> {
        self.url.or(self.file_url).or(self.file_url_camel)
    }
}

/// Uploads binary payloads, trying each candidate once in order.
pub struct AssetUploader {
    transport: Arc<dyn HttpTransport>,
    candidates: Vec<UploadCandidate>,
}

impl AssetUploader {
    /// Create an uploader over the given candidate chain.
    ///
    /// Two-stage candidates are always tried before form candidates; the
    /// relative order within each protocol is preserved.
    pub fn new(transport: Arc<dyn HttpTransport>, candidates: Vec<UploadCandidate>) -> Self {
        let (mut ordered, form): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.protocol == UploadProtocol::TwoStage);
        ordered.extend(form);
        Self {
            transport,
            candidates: ordered,
        }
    }

    /// The candidate chain in the order it is tried.
    #[must_use]
    pub fn candidates(&self) -> &[UploadCandidate] {
        &self.candidates
    }

    /// Upload `bytes`, returning the first hosted URL.
    pub async fn upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        file_name: &str,
        credential: &str,
    ) -> UploadResult {
        for (i, candidate) in self.candidates.iter().enumerate() {
            let attempt = match candidate.protocol {
                UploadProtocol::TwoStage => {
                    self.two_stage(candidate, bytes, mime_type, file_name, credential)
                        .await
                }
                UploadProtocol::FormData => {
                    self.form_data(candidate, bytes, mime_type, file_name, credential)
                        .await
                }
            };
            let endpoint = &candidate.endpoint_url;
            match attempt {
                Ok(url) => {
                    debug!(candidate = i + 1, %endpoint, %url, "upload succeeded");
                    return UploadResult::Hosted { url };
                }
                Err(reason) => {
                    debug!(candidate = i + 1, %endpoint, %reason, "upload candidate failed");
                }
            }
        }
        debug!(file_name, "all upload candidates failed");
        UploadResult::Failed
    }

    async fn two_stage(
        &self,
        candidate: &UploadCandidate,
        bytes: &[u8],
        mime_type: &str,
        file_name: &str,
        credential: &str,
    ) -> Result<String, String> {
        let descriptor = serde_json::json!({
            "content_type": mime_type,
            "file_name": file_name,
        });
        let initiate = HttpRequest::post_json(
            &candidate.endpoint_url,
            Some(Authorization::Key(credential.to_string())),
            descriptor,
        );
        let reply = self
            .transport
            .send(&initiate)
            .await
            .map_err(|e| e.to_string())?;
        if !reply.is_success() {
            return Err(format!("initiate returned {}: {}", reply.status, reply.text()));
        }
        let parsed: InitiateResponse = reply.json().map_err(|e| e.to_string())?;
        let (upload_url, file_url) = parsed
            .into_urls()
            .ok_or_else(|| "initiate response lacks upload_url or file_url".to_string())?;

        let put = HttpRequest::put_bytes(upload_url, mime_type, bytes.to_vec());
        let reply = self
            .transport
            .send(&put)
            .await
            .map_err(|e| e.to_string())?;
        if !reply.is_success() {
            return Err(format!("PUT returned {}", reply.status));
        }
        Ok(file_url)
    }

    async fn form_data(
        &self,
        candidate: &UploadCandidate,
        bytes: &[u8],
        mime_type: &str,
        file_name: &str,
        credential: &str,
    ) -> Result<String, String> {
        let fields = vec![
            FormField::File {
                name: "file".into(),
                file_name: file_name.into(),
                content_type: mime_type.into(),
                data: bytes.to_vec(),
            },
            FormField::Text {
                name: "content_type".into(),
                value: mime_type.into(),
            },
            FormField::Text {
                name: "filename".into(),
                value: file_name.into(),
            },
        ];
        let request = HttpRequest::post_form(
            &candidate.endpoint_url,
            Some(Authorization::Bearer(credential.to_string())),
            fields,
        );
        let reply = self
            .transport
            .send(&request)
            .await
            .map_err(|e| e.to_string())?;
        if !reply.is_success() {
            return Err(format!(
                "form upload returned {}: {}",
                reply.status,
                reply.text()
            ));
        }
        let parsed: FormUploadResponse = reply.json().map_err(|e| e.to_string())?;
        parsed
            .into_url()
            .ok_or_else(|| "form upload response lacks a URL".to_string())
    }
}
