//! Conversion between `data:` URIs and binary payloads.

use std::path::Path;

use base64::Engine;

use crate::error::GenError;

/// Binary payload recovered from a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// MIME type from the URI header (e.g. `"image/png"`).
    pub mime_type: String,
}

/// Parse a `data:<mime>;base64,<payload>` URI.
///
/// # Errors
///
/// Returns [`GenError::MalformedDataUri`] when the string does not match the
/// pattern or the payload is not valid base64. Callers treat this as "use the
/// original string as a literal reference".
pub fn decode(data_uri: &str) -> Result<DecodedBlob, GenError> {
    let malformed = || GenError::MalformedDataUri(preview(data_uri));

    let rest = data_uri.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(malformed)?;
    if mime_type.is_empty() || !mime_type.contains('/') {
        return Err(malformed());
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| malformed())?;
    Ok(DecodedBlob {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

/// Encode bytes as a `data:<mime>;base64,<payload>` URI.
#[must_use]
pub fn encode(bytes: &[u8], mime_type: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{payload}")
}

/// Whether a string should be treated as a data URI at all.
#[must_use]
pub fn is_data_uri(s: &str) -> bool {
    s.starts_with("data:")
}

/// Guess an image MIME type from a file extension.
#[must_use]
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// File extension for a MIME type, used to name uploads.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_png_uri() {
        let blob = decode("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(
            blob.bytes,
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }

    #[test]
    fn reencoding_preserves_payload_and_mime() {
        let uri = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";
        let first = decode(uri).unwrap();
        let second = decode(&encode(&first.bytes, &first.mime_type)).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn decode_rejects_plain_url() {
        assert!(matches!(
            decode("https://cdn.example/a.png"),
            Err(GenError::MalformedDataUri(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_base64_marker() {
        assert!(decode("data:image/png,rawtext").is_err());
    }

    #[test]
    fn decode_rejects_bad_payload() {
        assert!(decode("data:image/png;base64,!!not base64!!").is_err());
    }

    #[test]
    fn decode_rejects_missing_mime() {
        assert!(decode("data:;base64,AAAA").is_err());
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_type_for_path(Path::new("cat.PNG")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("cat.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("cat.jpg")), "image/jpeg");
        assert_eq!(
            mime_type_for_path(Path::new("cat")),
            "application/octet-stream"
        );
    }

    #[test]
    fn extension_from_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/webp"), "webp");
        assert_eq!(extension_for_mime("text/plain"), "bin");
    }
}
