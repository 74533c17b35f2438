//! Scripted transport for connector tests

use crate::transport::{QueryTransport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Reply = Result<Value, TransportError>;

/// Replies by substring match and records every query it receives
///
/// Routes are tried in registration order; the first whose needle occurs in
/// the query wins. Unmatched queries fall back to the default reply, or fail
/// with a connection error when none is set.
#[derive(Default)]
pub struct MockTransport {
    routes: Vec<(String, Reply)>,
    fallback: Option<Reply>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, needle: impl Into<String>, response: Value) -> Self {
        self.routes.push((needle.into(), Ok(response)));
        self
    }

    pub fn fail(mut self, needle: impl Into<String>, error: TransportError) -> Self {
        self.routes.push((needle.into(), Err(error)));
        self
    }

    pub fn respond_default(mut self, response: Value) -> Self {
        self.fallback = Some(Ok(response));
        self
    }

    /// Sleep before replying; the sleep observes cancellation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls.lock().iter().filter(|q| q.contains(needle)).count()
    }

    fn reply_for(&self, query: &str) -> Reply {
        self.routes
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| {
                Err(TransportError::Connection(format!(
                    "no mock response for query: {query}"
                )))
            })
    }
}

#[async_trait]
impl QueryTransport for MockTransport {
    async fn execute(&self, query: &str, cancel: CancellationToken) -> Result<Value, TransportError> {
        self.calls.lock().push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        self.reply_for(query)
    }
}
