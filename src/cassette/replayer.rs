//! Replays recorded exchanges from a cassette.

use std::collections::HashMap;

use super::format::{Cassette, Exchange, Outcome};
use crate::ports::http::Method;

/// Key for indexing exchanges by method and URL.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct RouteKey {
    method: Method,
    url: String,
}

/// Serves recorded outcomes in order, separately for each method/URL pair.
pub struct CassetteReplayer {
    queues: HashMap<RouteKey, Vec<Exchange>>,
    cursors: HashMap<RouteKey, usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<RouteKey, Vec<Exchange>> = HashMap::new();
        for exchange in &cassette.interactions {
            let key = RouteKey {
                method: exchange.method,
                url: exchange.url.clone(),
            };
            queues.entry(key).or_default().push(exchange.clone());
        }
        for queue in queues.values_mut() {
            queue.sort_by_key(|e| e.seq);
        }
        let cursors = queues.keys().map(|k| (k.clone(), 0)).collect();
        Self { queues, cursors }
    }

    /// Return the next recorded outcome for the given method and URL.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch if the cassette has no (more)
    /// exchanges for the route.
    pub fn next_outcome(&mut self, method: Method, url: &str) -> Result<Outcome, String> {
        let key = RouteKey {
            method,
            url: url.to_string(),
        };

        let Some(queue) = self.queues.get(&key) else {
            let mut available: Vec<String> = self
                .queues
                .keys()
                .map(|k| format!("{:?} {}", k.method, k.url))
                .collect();
            available.sort();
            return Err(format!(
                "Cassette has no exchanges for {method:?} {url}. Recorded routes: [{}]",
                available.join(", ")
            ));
        };

        let cursor = self.cursors.entry(key).or_insert(0);
        let exchange = queue.get(*cursor).ok_or_else(|| {
            format!(
                "Cassette exhausted: all {} exchanges for {method:?} {url} have been consumed",
                queue.len()
            )
        })?;
        *cursor += 1;
        Ok(exchange.response.clone())
    }
}
