//! Rendering of job outcomes: printing URLs and downloading images.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::GenError;
use crate::params::OutputFormat;
use crate::ports::http::{HttpRequest, HttpTransport};
use crate::result::{GeneratedImage, JobOutcome};

/// Message shown when a job completes without images.
pub const EMPTY_RESULT_MESSAGE: &str = "No images were returned";

/// Milliseconds since the Unix epoch, for fallback file names.
#[must_use]
pub fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Choose the file name for a downloaded image.
///
/// Uses the server-suggested name with any directory parts removed, or
/// `banana-<timestamp_ms>-<index>.<ext>` when there is none.
#[must_use]
pub fn download_name(
    image: &GeneratedImage,
    index: usize,
    timestamp_ms: u128,
    format: OutputFormat,
) -> String {
    image
        .file_name
        .as_deref()
        .and_then(sanitize_file_name)
        .unwrap_or_else(|| format!("banana-{timestamp_ms}-{index}.{}", format.extension()))
}

/// Strip directory components and characters unsafe in a file name.
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_control() || matches!(ch, ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                ch
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Insert `-<suffix>` before the extension: `cat.png` becomes `cat-1.png`.
fn with_suffix(name: &str, suffix: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}-{suffix}.{extension}"),
        _ => format!("{name}-{suffix}"),
    }
}

/// Print every image URL on its own line.
pub fn print_urls(outcome: &JobOutcome) {
    for image in &outcome.images {
        println!("{}", image.url);
    }
}

/// Download every image into `dir`, returning the written paths in order.
///
/// A name already used in this batch or already present in `dir` gets the
/// image index appended before its extension, so no file is overwritten.
///
/// # Errors
///
/// Returns an error if a download fails or a file cannot be written.
pub async fn save_all(
    transport: &dyn HttpTransport,
    outcome: &JobOutcome,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, GenError> {
    tokio::fs::create_dir_all(dir).await?;
    let timestamp = timestamp_ms();
    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(outcome.images.len());

    for (index, image) in outcome.images.iter().enumerate() {
        let reply = transport.send(&HttpRequest::get(&image.url, None)).await?;
        if !reply.is_success() {
            return Err(GenError::Transport(format!(
                "download of {} failed: HTTP {}",
                image.url, reply.status
            )));
        }

        let preferred = download_name(image, index, timestamp, format);
        let mut name = preferred.clone();
        let mut suffix = index;
        while used.contains(&name) || tokio::fs::try_exists(dir.join(&name)).await? {
            name = with_suffix(&preferred, suffix);
            suffix += outcome.images.len().max(1);
        }

        let path = dir.join(&name);
        tokio::fs::write(&path, &reply.body).await?;
        debug!(
            url = %image.url,
            path = %path.display(),
            bytes = reply.body.len(),
            "saved image"
        );
        used.insert(name);
        written.push(path);
    }
    Ok(written)
}
