//! In-memory transport for unit tests.
//!
//! Replies are scripted per method and URL. The last scripted reply for a
//! route repeats once the earlier ones are used up; unscripted routes answer
//! `404`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::GenError;
use crate::ports::http::{HttpReply, HttpRequest, HttpTransport, Method, TransportFuture};

#[derive(Clone)]
enum Scripted {
    Reply(HttpReply),
    Unreachable,
}

/// Scripted transport that records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Vec<Scripted>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method url`.
    pub fn on(self, method: Method, url: &str, status: u16, body: impl Into<String>) -> Self {
        let reply = HttpReply::new(status, Into::<String>::into(body));
        self.push(method, url, Scripted::Reply(reply));
        self
    }

    /// Queue a transport-level failure (no response) for `method url`.
    pub fn unreachable(self, method: Method, url: &str) -> Self {
        self.push(method, url, Scripted::Unreachable);
        self
    }

    fn push(&self, method: Method, url: &str, item: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push(item);
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests received for `method url`.
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn next(&self, request: &HttpRequest) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(request.method, request.url.clone()))?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        self.calls.lock().unwrap().push(request.clone());
        let scripted = self.next(request);
        let url = request.url.clone();
        Box::pin(async move {
            match scripted {
                Some(Scripted::Reply(reply)) => Ok(reply),
                Some(Scripted::Unreachable) => {
                    Err(GenError::Transport(format!("connection refused: {url}")))
                }
                None => Ok(HttpReply::new(404, "not scripted")),
            }
        })
    }
}
