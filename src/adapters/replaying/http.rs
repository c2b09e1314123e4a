//! Replaying adapter for the `HttpTransport` port.

use std::sync::{Arc, Mutex};

use super::next_reply;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::http::{HttpRequest, HttpTransport, TransportFuture};

/// Serves recorded exchanges from a cassette; never touches the network.
pub struct ReplayingTransport {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingTransport {
    /// Create a replaying transport backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl HttpTransport for ReplayingTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let result = next_reply(&self.replayer, request);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Exchange, Outcome};
    use crate::error::GenError;
    use crate::ports::http::{HttpReply, Method};
    use chrono::Utc;

    fn transport(interactions: Vec<Exchange>) -> ReplayingTransport {
        let cassette = Cassette {
            name: "t".into(),
            recorded_at: Utc::now(),
            commit: "c".into(),
            interactions,
        };
        ReplayingTransport::new(Arc::new(Mutex::new(CassetteReplayer::new(&cassette))))
    }

    #[tokio::test]
    async fn serves_recorded_reply_and_error() {
        let transport = transport(vec![
            Exchange {
                seq: 0,
                method: Method::Get,
                url: "https://q/status".into(),
                auth: None,
                body: None,
                response: Outcome::Reply(HttpReply::new(200, "ok")),
            },
            Exchange {
                seq: 1,
                method: Method::Get,
                url: "https://q/result".into(),
                auth: None,
                body: None,
                response: Outcome::Error("timed out".into()),
            },
        ]);

        let reply = transport
            .send(&HttpRequest::get("https://q/status", None))
            .await
            .unwrap();
        assert_eq!(reply.text(), "ok");
        let err = transport
            .send(&HttpRequest::get("https://q/result", None))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Transport(m) if m == "timed out"));
    }

    #[tokio::test]
    async fn unrecorded_request_is_a_transport_error() {
        let transport = transport(vec![]);
        let err = transport
            .send(&HttpRequest::get("https://q/status", None))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Transport(_)));
    }
}
