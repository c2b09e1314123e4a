//! Turning user-supplied reference images into the job's `image_urls`.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::blob;
use crate::cancel::CancellationToken;
use crate::error::GenError;
use crate::upload::{AssetUploader, UploadResult};

/// A reference image as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceImage {
    /// Already hosted; sent unchanged.
    Remote(String),
    /// Inline `data:` URI.
    DataUri(String),
    /// Local file.
    File(PathBuf),
}

impl ReferenceImage {
    /// Classify an argument as URL, data URI, or file path.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Remote(arg.to_string())
        } else if blob::is_data_uri(arg) {
            Self::DataUri(arg.to_string())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// How one reference ended up in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReference {
    /// Uploaded and referenced by its hosted URL.
    Hosted(String),
    /// Upload failed; sent inline as a data URI.
    Inline(String),
    /// Sent as given (remote URL, or a string that only looked like a data URI).
    Passthrough(String),
}

impl ResolvedReference {
    /// The string placed in `image_urls`.
    #[must_use]
    pub fn into_url(self) -> String {
        match self {
            Self::Hosted(s) | Self::Inline(s) | Self::Passthrough(s) => s,
        }
    }
}

/// Resolve references one at a time, keeping their order.
///
/// Each local or inline image is uploaded; if every upload endpoint fails the
/// image is sent inline instead, in the same position. With
/// `inline_fallback == false` an exhausted upload is an error. `cancel` is
/// checked before each reference.
///
/// # Errors
///
/// Returns [`GenError::Io`] if a file cannot be read,
/// [`GenError::UploadExhausted`] when uploads fail and inline fallback is off,
/// or [`GenError::Cancelled`] once `cancel` is set.
pub async fn resolve_references(
    uploader: &AssetUploader,
    credential: &str,
    references: &[ReferenceImage],
    inline_fallback: bool,
    cancel: &CancellationToken,
) -> Result<Vec<ResolvedReference>, GenError> {
    debug!(
        count = references.len(),
        candidates = uploader.candidates().len(),
        "resolving reference images"
    );
    let mut resolved = Vec::with_capacity(references.len());
    for (i, reference) in references.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(GenError::Cancelled);
        }
        let entry = match reference {
            ReferenceImage::Remote(url) => ResolvedReference::Passthrough(url.clone()),
            ReferenceImage::DataUri(uri) => match blob::decode(uri) {
                Ok(decoded) => {
                    let extension = blob::extension_for_mime(&decoded.mime_type);
                    let file_name = format!("reference-{}.{extension}", i + 1);
                    let result = uploader
                        .upload(&decoded.bytes, &decoded.mime_type, &file_name, credential)
                        .await;
                    settle(result, || uri.clone(), inline_fallback)?
                }
                Err(e) => {
                    debug!(index = i, error = %e, "not a decodable data URI; sending as given");
                    ResolvedReference::Passthrough(uri.clone())
                }
            },
            ReferenceImage::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                let mime_type = blob::mime_type_for_path(path);
                let file_name = upload_file_name(path, i);
                let result = uploader
                    .upload(&bytes, mime_type, &file_name, credential)
                    .await;
                settle(result, || blob::encode(&bytes, mime_type), inline_fallback)?
            }
        };
        if let ResolvedReference::Inline(_) = entry {
            warn!(index = i, "upload failed; sending reference image inline");
        }
        resolved.push(entry);
    }
    Ok(resolved)
}

fn settle(
    result: UploadResult,
    inline: impl FnOnce() -> String,
    inline_fallback: bool,
) -> Result<ResolvedReference, GenError> {
    if inline_fallback && matches!(result, UploadResult::Failed) {
        return Ok(ResolvedReference::Inline(inline()));
    }
    result.into_hosted().map(ResolvedReference::Hosted)
}

fn upload_file_name(path: &Path, index: usize) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| format!("reference-{}", index + 1), str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::scripted::ScriptedTransport;
    use crate::ports::http::{FormField, HttpRequest, HttpTransport, Method, RequestBody};
    use crate::upload::UploadCandidate;

    const FORM: &str = "https://storage.test/upload";

    fn uploader(transport: &Arc<ScriptedTransport>) -> AssetUploader {
        AssetUploader::new(
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            vec![UploadCandidate::form_data(FORM)],
        )
    }

    async fn resolve(
        transport: &Arc<ScriptedTransport>,
        references: &[ReferenceImage],
        inline_fallback: bool,
    ) -> Result<Vec<ResolvedReference>, GenError> {
        let cancel = CancellationToken::new();
        resolve_references(
            &uploader(transport),
            "fal-key",
            references,
            inline_fallback,
            &cancel,
        )
        .await
    }

    fn uploaded_file_name(request: &HttpRequest) -> String {
        let RequestBody::Multipart { fields } = &request.body else {
            panic!("expected multipart")
        };
        fields
            .iter()
            .find_map(|f| match f {
                FormField::File { file_name, .. } => Some(file_name.clone()),
                FormField::Text { .. } => None,
            })
            .unwrap()
    }

    #[test]
    fn parse_classifies_arguments() {
        assert_eq!(
            ReferenceImage::parse("https://a/b.png"),
            ReferenceImage::Remote("https://a/b.png".into())
        );
        assert_eq!(
            ReferenceImage::parse("data:image/png;base64,AA=="),
            ReferenceImage::DataUri("data:image/png;base64,AA==".into())
        );
        assert_eq!(
            ReferenceImage::parse("./cat.png"),
            ReferenceImage::File(PathBuf::from("./cat.png"))
        );
    }

    #[tokio::test]
    async fn failed_upload_is_replaced_inline_in_place() {
        let img1 = blob::encode(b"one", "image/png");
        let img2 = blob::encode(b"two", "image/png");
        let img3 = blob::encode(b"three", "image/png");
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(Method::Post, FORM, 200, r#"{"url":"https://cdn.test/A"}"#)
                .on(Method::Post, FORM, 500, "flaky")
                .on(Method::Post, FORM, 200, r#"{"url":"https://cdn.test/C"}"#),
        );
        let references: Vec<ReferenceImage> = [&img1, &img2, &img3]
            .iter()
            .map(|s| ReferenceImage::DataUri((*s).clone()))
            .collect();

        let resolved = resolve(&transport, &references, true).await.unwrap();

        let urls: Vec<String> = resolved
            .into_iter()
            .map(ResolvedReference::into_url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.test/A".to_string(),
                img2,
                "https://cdn.test/C".to_string(),
            ]
        );
        let names: Vec<String> = transport.calls().iter().map(uploaded_file_name).collect();
        assert_eq!(
            names,
            vec!["reference-1.png", "reference-2.png", "reference-3.png"]
        );
    }

    #[tokio::test]
    async fn exhausted_upload_errors_without_inline_fallback() {
        let transport = Arc::new(ScriptedTransport::new().on(Method::Post, FORM, 500, "down"));
        let references = vec![ReferenceImage::DataUri(blob::encode(b"x", "image/jpeg"))];

        let result = resolve(&transport, &references, false).await;

        assert!(matches!(result, Err(GenError::UploadExhausted)));
    }

    #[tokio::test]
    async fn remote_and_malformed_references_pass_through_without_upload() {
        let transport = Arc::new(ScriptedTransport::new());
        let references = vec![
            ReferenceImage::Remote("https://cdn.test/existing.png".into()),
            ReferenceImage::DataUri("data:garbage".into()),
        ];

        let resolved = resolve(&transport, &references, true).await.unwrap();

        assert_eq!(
            resolved,
            vec![
                ResolvedReference::Passthrough("https://cdn.test/existing.png".into()),
                ResolvedReference::Passthrough("data:garbage".into()),
            ]
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_upload() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::Post,
            FORM,
            200,
            r#"{"url":"https://cdn.test/A"}"#,
        ));
        let references = vec![ReferenceImage::DataUri(blob::encode(b"x", "image/png"))];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = resolve_references(
            &uploader(&transport),
            "fal-key",
            &references,
            true,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(GenError::Cancelled)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn local_file_is_uploaded_under_its_name() {
        let dir = std::env::temp_dir().join("bananagen_references_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kitten.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();
        let transport = Arc::new(ScriptedTransport::new().on(Method::Post, FORM, 500, "down"));

        let resolved = resolve(&transport, &[ReferenceImage::File(path)], true)
            .await
            .unwrap();

        assert_eq!(
            resolved,
            vec![ResolvedReference::Inline(blob::encode(
                b"jpeg-bytes",
                "image/jpeg"
            ))]
        );
        assert_eq!(uploaded_file_name(&transport.calls()[0]), "kitten.jpg");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let transport = Arc::new(ScriptedTransport::new());
        let references = vec![ReferenceImage::File(PathBuf::from("/nonexistent/ref.png"))];

        let result = resolve(&transport, &references, true).await;

        assert!(matches!(result, Err(GenError::Io(_))));
    }
}
