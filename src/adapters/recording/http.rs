//! Recording adapter for the `HttpTransport` port.

use std::sync::{Arc, Mutex};

use super::record_exchange;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::http::{HttpRequest, HttpTransport, TransportFuture};

/// Records every exchange while delegating to an inner transport.
pub struct RecordingTransport {
    inner: Arc<dyn HttpTransport>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingTransport {
    /// Creates a new recording transport wrapping the given implementation.
    pub fn new(inner: Arc<dyn HttpTransport>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl HttpTransport for RecordingTransport {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let request = request.clone();
        let recorder = Arc::clone(&self.recorder);

        Box::pin(async move {
            let result = self.inner.send(&request).await;
            record_exchange(&recorder, &request, &result);
            result
        })
    }
}
