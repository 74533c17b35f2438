//! The injected transport seam
//!
//! Connectors never build HTTP requests. The host supplies a
//! [`QueryTransport`] that turns a compiled query into a raw JSON response;
//! auth, endpoints, timeouts and retries all live behind it.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Failure reported by a transport
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// Non-success status; the body is kept when it was JSON
    #[error("HTTP {status}")]
    Http { status: u16, body: Option<Value> },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request cancelled")]
    Cancelled,
}

/// Executes one compiled query
///
/// Implementations should stop work and return [`TransportError::Cancelled`]
/// once `cancel` fires. Callers additionally race the returned future
/// against the token, so a transport that ignores it is still abandoned.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn execute(&self, query: &str, cancel: CancellationToken) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: QueryTransport + ?Sized> QueryTransport for Arc<T> {
    async fn execute(&self, query: &str, cancel: CancellationToken) -> Result<Value, TransportError> {
        (**self).execute(query, cancel).await
    }
}

/// Adapter turning an async closure into a transport
pub struct FnTransport<F> {
    f: F,
}

impl<F> FnTransport<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> QueryTransport for FnTransport<F>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TransportError>> + Send,
{
    async fn execute(&self, query: &str, cancel: CancellationToken) -> Result<Value, TransportError> {
        (self.f)(query.to_string(), cancel).await
    }
}
