//! Queue job client: submit, poll to a terminal state, fetch the result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::GenError;
use crate::params::{validate_count, AspectRatio, OutputFormat, Resolution, MAX_REFERENCE_IMAGES};
use crate::ports::http::{Authorization, HttpReply, HttpRequest, HttpTransport};
use crate::result::{has_images, normalize, JobOutcome};

/// Parameters of one generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    /// Text prompt.
    pub prompt: String,
    /// Number of images to generate.
    pub num_images: u32,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Output resolution.
    pub resolution: Resolution,
    /// Output encoding.
    pub output_format: OutputFormat,
    /// Reference images, in the order the model should see them.
    pub reference_image_urls: Vec<String>,
}

impl JobParams {
    /// Text-only parameters with default settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_images: 1,
            aspect_ratio: AspectRatio::Square,
            resolution: Resolution::OneK,
            output_format: OutputFormat::Png,
            reference_image_urls: Vec::new(),
        }
    }

    /// Whether the job is conditioned on reference images.
    #[must_use]
    pub fn edit_mode(&self) -> bool {
        !self.reference_image_urls.is_empty()
    }

    /// Check the invariants the queue relies on.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidArgument`] for an empty prompt, an image
    /// count outside the supported range, or too many reference images.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.prompt.trim().is_empty() {
            return Err(GenError::InvalidArgument("prompt is empty".into()));
        }
        validate_count(self.num_images).map_err(GenError::InvalidArgument)?;
        if self.reference_image_urls.len() > MAX_REFERENCE_IMAGES {
            return Err(GenError::InvalidArgument(format!(
                "at most {MAX_REFERENCE_IMAGES} reference images are supported, got {}",
                self.reference_image_urls.len()
            )));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    num_images: u32,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    output_format: OutputFormat,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    image_urls: &'a [String],
    sync_mode: bool,
}

impl<'a> From<&'a JobParams> for SubmitBody<'a> {
    fn from(params: &'a JobParams) -> Self {
        Self {
            prompt: &params.prompt,
            num_images: params.num_images,
            aspect_ratio: params.aspect_ratio,
            resolution: params.resolution,
            output_format: params.output_format,
            image_urls: &params.reference_image_urls,
            sync_mode: false,
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    request_id: Option<String>,
    status_url: Option<String>,
    response_url: Option<String>,
}

/// A submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Server-assigned identifier.
    pub request_id: String,
    /// URL polled for status.
    pub status_url: String,
    /// URL of the final result.
    pub result_url: String,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
}

/// Status reported by one poll.
///
/// The non-terminal states carry the most recent log message, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued(Option<String>),
    /// Running.
    InProgress(Option<String>),
    /// Finished; carries the status payload.
    Completed(Value),
    /// Finished unsuccessfully; carries the reason.
    Failed(String),
}

impl JobStatus {
    /// Classify a status payload.
    #[must_use]
    pub fn from_payload(payload: Value) -> Self {
        match payload.get("status").and_then(Value::as_str) {
            Some("COMPLETED") => Self::Completed(payload),
            Some("FAILED") => Self::Failed(failure_message(&payload)),
            Some("IN_QUEUE") => Self::Queued(latest_log(&payload)),
            _ => Self::InProgress(latest_log(&payload)),
        }
    }
}

fn failure_message(payload: &Value) -> String {
    let error = payload.get("error");
    error
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .unwrap_or("Image generation failed")
        .to_string()
}

/// Message of the last log entry; `"Processing..."` if that entry has none.
fn latest_log(payload: &Value) -> Option<String> {
    let last = payload.get("logs")?.as_array()?.last()?;
    let message = last.get("message").and_then(Value::as_str);
    Some(message.unwrap_or("Processing...").to_string())
}

/// Progress notifications emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The queue accepted the job.
    Submitted {
        /// Server-assigned identifier.
        request_id: String,
    },
    /// The job is waiting for a worker.
    Queued {
        /// Position in the queue, when reported.
        position: Option<u64>,
    },
    /// Latest log line from the worker.
    Progress {
        /// Log message.
        message: String,
    },
}

/// Polling cadence. The defaults (5 s, 60 checks) bound a job at five minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed wait before every status check.
    pub interval: Duration,
    /// Number of status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Client for one queue application.
pub struct JobClient {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    policy: PollPolicy,
}

impl JobClient {
    /// Create a client for the queue application at `endpoint`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            transport,
            endpoint,
            policy,
        }
    }

    /// Submit a job and track it to completion.
    ///
    /// Jobs with reference images go to the `/edit` route. `cancel` is checked
    /// before the submission and immediately before and after every wait;
    /// `on_event` receives progress.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the job: [`GenError::Submission`],
    /// [`GenError::Poll`], [`GenError::RemoteFailure`], [`GenError::TimedOut`],
    /// [`GenError::Cancelled`], or a transport/parse error.
    pub async fn submit(
        &self,
        credential: &str,
        params: &JobParams,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(JobEvent),
    ) -> Result<JobOutcome, GenError> {
        params.validate()?;
        if cancel.is_cancelled() {
            return Err(GenError::Cancelled);
        }
        let handle = self.enqueue(credential, params).await?;
        on_event(JobEvent::Submitted {
            request_id: handle.request_id.clone(),
        });

        let payload = self
            .poll_until_terminal(credential, &handle, cancel, &mut on_event)
            .await?;
        let outcome = normalize(&handle.request_id, &payload)?;
        debug!(
            request_id = %handle.request_id,
            images = outcome.images.len(),
            elapsed_s = (Utc::now() - handle.submitted_at).num_seconds(),
            "job completed"
        );
        Ok(outcome)
    }

    fn submit_url(&self, edit_mode: bool) -> String {
        if edit_mode {
            format!("{}/edit", self.endpoint)
        } else {
            self.endpoint.clone()
        }
    }

    async fn enqueue(&self, credential: &str, params: &JobParams) -> Result<JobHandle, GenError> {
        let body = serde_json::to_value(SubmitBody::from(params)).map_err(|e| {
            GenError::InvalidArgument(format!("cannot encode job parameters: {e}"))
        })?;
        let url = self.submit_url(params.edit_mode());
        debug!(%url, edit_mode = params.edit_mode(), "submitting job");

        let request = HttpRequest::post_json(url, Some(auth(credential)), body);
        let reply = self.transport.send(&request).await?;
        if !reply.is_success() {
            return Err(GenError::Submission {
                detail: submission_detail(&reply),
            });
        }

        let parsed: SubmitResponse = reply.json()?;
        let request_id = parsed
            .request_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GenError::Submission {
                detail: "response has no request_id".into(),
            })?;
        let status_url = parsed
            .status_url
            .unwrap_or_else(|| format!("{}/requests/{request_id}/status", self.endpoint));
        let result_url = parsed
            .response_url
            .unwrap_or_else(|| format!("{}/requests/{request_id}", self.endpoint));

        Ok(JobHandle {
            request_id,
            status_url,
            result_url,
            submitted_at: Utc::now(),
        })
    }

    async fn poll_until_terminal(
        &self,
        credential: &str,
        handle: &JobHandle,
        cancel: &CancellationToken,
        on_event: &mut impl FnMut(JobEvent),
    ) -> Result<Value, GenError> {
        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(GenError::Cancelled);
            }
            tokio::time::sleep(self.policy.interval).await;
            if cancel.is_cancelled() {
                return Err(GenError::Cancelled);
            }

            let payload = self.check_status(credential, handle).await?;
            let position = payload.get("queue_position").and_then(Value::as_u64);
            let status = JobStatus::from_payload(payload);
            debug!(attempt, request_id = %handle.request_id, ?status, "status check");

            let log = match status {
                JobStatus::Completed(payload) => {
                    return Ok(self.final_payload(credential, handle, payload).await);
                }
                JobStatus::Failed(message) => return Err(GenError::RemoteFailure { message }),
                JobStatus::Queued(log) => {
                    on_event(JobEvent::Queued { position });
                    log
                }
                JobStatus::InProgress(log) => log,
            };
            if let Some(message) = log {
                on_event(JobEvent::Progress { message });
            }
        }
        Err(GenError::TimedOut {
            attempts: self.policy.max_attempts,
        })
    }

    async fn check_status(&self, credential: &str, handle: &JobHandle) -> Result<Value, GenError> {
        let request = HttpRequest::get(&handle.status_url, Some(auth(credential)));
        let reply = self.transport.send(&request).await?;
        if !reply.is_success() {
            return Err(GenError::Poll {
                status: reply.status,
            });
        }
        reply.json()
    }

    /// Payload to normalize once the job is `COMPLETED`.
    ///
    /// A status payload that already lists images is used as is. Otherwise
    /// the result URL is fetched; if that fails the status payload is used,
    /// which may be missing fields.
    async fn final_payload(
        &self,
        credential: &str,
        handle: &JobHandle,
        status_payload: Value,
    ) -> Value {
        if has_images(&status_payload) {
            return status_payload;
        }
        let request = HttpRequest::get(&handle.result_url, Some(auth(credential)));
        let fetched = self.transport.send(&request).await.and_then(|reply| {
            if reply.is_success() {
                reply.json::<Value>()
            } else {
                Err(GenError::Poll {
                    status: reply.status,
                })
            }
        });
        match fetched {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    request_id = %handle.request_id,
                    error = %e,
                    "result fetch failed; using status payload"
                );
                status_payload
            }
        }
    }
}

fn auth(credential: &str) -> Authorization {
    Authorization::Key(credential.to_string())
}

/// Human-readable reason for a rejected submission.
fn submission_detail(reply: &HttpReply) -> String {
    let fallback = format!("HTTP error! status: {}", reply.status);
    let Ok(value) = reply.json::<Value>() else {
        return fallback;
    };
    match value.get("detail") {
        None | Some(Value::Null) => fallback,
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                Value::Array(items.clone()).to_string()
            } else {
                messages.join("; ")
            }
        }
        Some(other) => other.to_string(),
    }
}
