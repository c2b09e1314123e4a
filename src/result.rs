//! Normalization of job result payloads.
//!
//! Queue applications answer with either `{images: [...]}` or
//! `{data: {images: [...]}}`. Both collapse into a [`JobOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenError;

/// A generated image hosted by the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Where the image can be fetched.
    pub url: String,
    /// Server-suggested file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// MIME type, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Canonical result of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Server-assigned job identifier.
    pub request_id: String,
    /// Generated images; empty means the job produced none.
    pub images: Vec<GeneratedImage>,
    /// Optional text the model returned alongside the images.
    pub description: Option<String>,
}

impl JobOutcome {
    /// Whether the job completed without producing any image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Which of the known layouts a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `{data: {images: [...]}}`
    Nested,
    /// `{images: [...]}`
    Flat,
}

/// Detect the layout of a payload, or `None` if it has no image list at all.
#[must_use]
pub fn detect_shape(payload: &Value) -> Option<ResultShape> {
    if payload.get("data").and_then(|d| d.get("images")).is_some() {
        Some(ResultShape::Nested)
    } else if payload.get("images").is_some() {
        Some(ResultShape::Flat)
    } else {
        None
    }
}

/// The object holding `images` (and `description`) for a given shape.
fn body(payload: &Value, shape: ResultShape) -> &Value {
    match shape {
        ResultShape::Nested => &payload["data"],
        ResultShape::Flat => payload,
    }
}

/// Whether the payload already carries a non-empty image list.
#[must_use]
pub fn has_images(payload: &Value) -> bool {
    let Some(shape) = detect_shape(payload) else {
        return false;
    };
    body(payload, shape)["images"]
        .as_array()
        .is_some_and(|a| !a.is_empty())
}

/// Collapse a raw payload into a [`JobOutcome`].
///
/// # Errors
///
/// Returns [`GenError::UnrecognizedResult`] when neither layout is present or
/// the image list is not a list of `{url, ...}` objects. A present but `null`
/// or empty list is a valid outcome with no images.
pub fn normalize(request_id: &str, payload: &Value) -> Result<JobOutcome, GenError> {
    let shape = detect_shape(payload).ok_or_else(|| {
        let detail = format!("no `images` or `data.images` field in {}", keys_of(payload));
        GenError::UnrecognizedResult(detail)
    })?;
    let body = body(payload, shape);

    let images = match &body["images"] {
        Value::Null => Vec::new(),
        list @ Value::Array(_) => parse_images(list)?,
        other => {
            let detail = format!("`images` is not a list: {other}");
            return Err(GenError::UnrecognizedResult(detail));
        }
    };
    let description = body
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(JobOutcome {
        request_id: request_id.to_string(),
        images,
        description,
    })
}

fn parse_images(list: &Value) -> Result<Vec<GeneratedImage>, GenError> {
    Vec::<GeneratedImage>::deserialize(list)
        .map_err(|e| GenError::UnrecognizedResult(format!("bad image list: {e}")))
}

fn keys_of(payload: &Value) -> String {
    match payload.as_object() {
        Some(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        None => "non-object payload".to_string(),
    }
}
