//! Replaying adapters that serve recorded exchanges from cassettes.

pub mod http;

use std::sync::{Arc, Mutex};

use crate::cassette::format::Outcome;
use crate::cassette::replayer::CassetteReplayer;
use crate::error::GenError;
use crate::ports::http::{HttpReply, HttpRequest};

/// Look up the recorded result for a request.
pub(crate) fn next_reply(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    request: &HttpRequest,
) -> Result<HttpReply, GenError> {
    let mut guard = replayer
        .lock()
        .map_err(|e| GenError::Transport(format!("replayer lock poisoned: {e}")))?;
    let outcome = guard
        .next_outcome(request.method, &request.url)
        .map_err(GenError::Transport)?;
    match outcome {
        Outcome::Reply(reply) => Ok(reply),
        Outcome::Error(message) => Err(GenError::Transport(message)),
    }
}
