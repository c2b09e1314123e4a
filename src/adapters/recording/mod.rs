//! Recording adapters that capture exchanges to cassettes.

pub mod http;

use std::sync::{Arc, Mutex};

use crate::cassette::format::Outcome;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::GenError;
use crate::ports::http::{HttpReply, HttpRequest};

/// Record a transport result using the reply/error convention.
pub(crate) fn record_exchange(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    request: &HttpRequest,
    result: &Result<HttpReply, GenError>,
) {
    let outcome = match result {
        Ok(reply) => Outcome::Reply(reply.clone()),
        Err(e) => Outcome::Error(e.to_string()),
    };
    // A poisoned lock only means another recording panicked; keep recording.
    let mut guard = recorder
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.record(request, outcome);
}
