//! Cache-aware query execution shared by the three facades

use crate::error::{ConnectorError, ConnectorResult};
use graphlens_core::{CancellationToken, QueryEngine, QueryTransport, RequestCache};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs compiled queries through the injected transport
///
/// Pipeline per call: cancellation check, cache lookup, transport race
/// against the token, error envelope detection, decode. The cache is only
/// written after a decode succeeded and the token is still live.
pub struct QueryExecutor {
    engine: QueryEngine,
    transport: Arc<dyn QueryTransport>,
    cache: RequestCache,
}

impl QueryExecutor {
    pub fn new(engine: QueryEngine, transport: Arc<dyn QueryTransport>, cache: RequestCache) -> Self {
        Self {
            engine,
            transport,
            cache,
        }
    }

    pub fn engine(&self) -> QueryEngine {
        self.engine
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Execute `query` and decode the body
    pub async fn fetch_decoded<T, F>(
        &self,
        operation: &'static str,
        query: &str,
        cancel: &CancellationToken,
        decode: F,
    ) -> ConnectorResult<T>
    where
        F: FnOnce(&Value) -> ConnectorResult<T>,
    {
        if cancel.is_cancelled() {
            return Err(ConnectorError::Cancelled);
        }

        if let Some(cached) = self.cache.get(self.engine, query) {
            debug!(engine = %self.engine, operation, "request cache hit");
            return decode(&cached);
        }

        let body = self.execute(operation, query, cancel).await?;
        let decoded = decode(&body)?;

        if !cancel.is_cancelled() {
            self.cache.insert(self.engine, query, Arc::new(body));
        }
        Ok(decoded)
    }

    async fn execute(
        &self,
        operation: &'static str,
        query: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Value> {
        info!(engine = %self.engine, operation, "executing query");
        debug!(engine = %self.engine, operation, query, "compiled query");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConnectorError::Cancelled),
            result = self.transport.execute(query, cancel.clone()) => result,
        };

        let body = result.map_err(|e| self.report(operation, ConnectorError::from(e)))?;
        match ConnectorError::from_envelope(&body) {
            Some(err) => Err(self.report(operation, err)),
            None => Ok(body),
        }
    }

    fn report(&self, operation: &'static str, err: ConnectorError) -> ConnectorError {
        match &err {
            ConnectorError::Backend { code, message } => {
                error!(engine = %self.engine, operation, code = ?code, %message, "backend error");
            }
            ConnectorError::Transport(e) => {
                error!(engine = %self.engine, operation, error = %e, "transport error");
            }
            _ => {}
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlens_core::test_utils::MockTransport;
    use graphlens_core::TransportError;
    use serde_json::json;
    use std::time::Duration;

    fn executor(transport: MockTransport) -> (QueryExecutor, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let executor = QueryExecutor::new(
            QueryEngine::Gremlin,
            transport.clone(),
            RequestCache::default(),
        );
        (executor, transport)
    }

    fn results(body: &Value) -> ConnectorResult<usize> {
        body.get("results")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| ConnectorError::validation("missing results"))
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let (executor, transport) =
            executor(MockTransport::new().respond("g.V()", json!({ "results": [1, 2] })));
        let cancel = CancellationToken::new();

        assert_eq!(executor.fetch_decoded("test", "g.V()", &cancel, results).await.unwrap(), 2);
        assert_eq!(executor.fetch_decoded("test", "g.V()", &cancel, results).await.unwrap(), 2);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_cached() {
        let (executor, transport) =
            executor(MockTransport::new().respond("g.V()", json!({ "unexpected": true })));
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let err = executor.fetch_decoded("test", "g.V()", &cancel, results).await.unwrap_err();
            assert!(matches!(err, ConnectorError::Validation(_)));
        }
        assert_eq!(transport.call_count(), 2);
        assert!(executor.cache().is_empty());
    }

    #[tokio::test]
    async fn test_error_envelope_in_success_body() {
        let (executor, _) = executor(MockTransport::new().respond(
            "g.V()",
            json!({ "code": "ConstraintViolationException", "detailedMessage": "nope" }),
        ));
        let err = executor
            .fetch_decoded("test", "g.V()", &CancellationToken::new(), results)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConnectorError::Backend {
                code: Some("ConstraintViolationException".into()),
                message: "nope".into()
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_unchanged() {
        let (executor, transport) = executor(
            MockTransport::new().fail("g.V()", TransportError::Connection("refused".into())),
        );
        let err = executor
            .fetch_decoded("test", "g.V()", &CancellationToken::new(), results)
            .await
            .unwrap_err();
        assert_eq!(err, ConnectorError::Transport(TransportError::Connection("refused".into())));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_transport() {
        let (executor, transport) = executor(MockTransport::new().respond_default(json!({ "results": [] })));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor.fetch_decoded("test", "g.V()", &cancel, results).await.unwrap_err();
        assert_eq!(err, ConnectorError::Cancelled);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_transport_writes_no_cache() {
        let (executor, _) = executor(
            MockTransport::new()
                .respond_default(json!({ "results": [] }))
                .with_delay(Duration::from_secs(5)),
        );
        let executor = Arc::new(executor);
        let cancel = CancellationToken::new();

        let task = {
            let executor = executor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { executor.fetch_decoded("test", "g.V()", &cancel, results).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap().unwrap_err(), ConnectorError::Cancelled);
        assert!(executor.cache().is_empty());
    }
}
