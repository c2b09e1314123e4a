//! Unified error type for bananagen.

use thiserror::Error;

/// Errors that can occur while preparing, submitting, or tracking a job.
#[derive(Debug, Error)]
pub enum GenError {
    /// A string that looked like a data URI did not match `data:<mime>;base64,<payload>`.
    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    /// The queue rejected the job submission.
    #[error("Submission failed: {detail}")]
    Submission {
        /// Server-provided detail message, or the HTTP status.
        detail: String,
    },

    /// A status check returned a non-success HTTP status.
    #[error("Status check failed: {status}")]
    Poll {
        /// HTTP status code.
        status: u16,
    },

    /// The remote job reached the `FAILED` state.
    #[error("Generation failed: {message}")]
    RemoteFailure {
        /// Error message reported by the server.
        message: String,
    },

    /// The job did not reach a terminal state within the polling ceiling.
    #[error("Timed out: image generation took too long ({attempts} status checks)")]
    TimedOut {
        /// Number of status checks made before giving up.
        attempts: u32,
    },

    /// The job was cancelled by the user.
    #[error("Cancelled")]
    Cancelled,

    /// Every upload candidate failed.
    #[error("All upload endpoints failed")]
    UploadExhausted,

    /// A result payload matched neither known image-list shape.
    #[error("Unrecognized result payload: {0}")]
    UnrecognizedResult(String),

    /// A response body could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A transport error that did not come from reqwest (e.g. replayed from a cassette).
    #[error("Transport error: {0}")]
    Transport(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No credential configured.
    #[error("No API key configured. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The environment variable name.
        env_var: String,
    },
}
