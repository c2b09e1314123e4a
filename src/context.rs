//! Service context that bundles the transport port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::http::ReqwestTransport;
use crate::adapters::recording::http::RecordingTransport;
use crate::adapters::replaying::http::ReplayingTransport;
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::GenError;
use crate::ports::HttpTransport;

/// Directory that recorded cassettes are written under.
const CASSETTE_DIR: &str = ".bananagen/cassettes";

/// Bundles the port trait objects used by one run.
pub struct ServiceContext {
    /// HTTP transport port, shared by the uploader, job client, and downloads.
    pub transport: Arc<dyn HttpTransport>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write the cassette file to disk.
    ///
    /// Every clone of the recording transport must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording transport still has references".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context that talks to the network.
    #[must_use]
    pub fn live() -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    /// Create a recording context that wraps the live transport with a recorder.
    #[must_use]
    pub fn recording() -> (Self, RecordingSession) {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(CASSETTE_DIR)
            .join(&timestamp)
            .join("http.cassette.yaml");

        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-http"),
            get_commit_hash(),
        )));
        let live = Self::live();
        let transport = RecordingTransport::new(live.transport, Arc::clone(&recorder));

        let ctx = Self {
            transport: Arc::new(transport),
        };
        (ctx, RecordingSession { recorder })
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, GenError> {
        let replayer = load_cassette(path)
            .map_err(|e| GenError::Config(format!("Failed to load cassette: {e}")))?;
        let transport = ReplayingTransport::new(Arc::new(Mutex::new(replayer)));
        Ok(Self {
            transport: Arc::new(transport),
        })
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
