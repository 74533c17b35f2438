//! Connector construction from configuration

use crate::connector::GraphConnector;
use crate::error::{ConnectorError, ConnectorResult};
use crate::gremlin::GremlinConnector;
use crate::opencypher::OpenCypherConnector;
use crate::sparql::SparqlConnector;
use graphlens_config::{ConnectionConfig, QueryEngine};
use graphlens_core::QueryTransport;
use std::sync::Arc;
use tracing::info;

/// Build the connector for `config.query_engine` on top of `transport`
///
/// The configuration is validated first; every connector owns its own
/// request cache and, for SPARQL, its own blank-node registry.
pub fn connector_from_config(
    config: &ConnectionConfig,
    transport: Arc<dyn QueryTransport>,
) -> ConnectorResult<Box<dyn GraphConnector>> {
    config
        .validate()
        .map_err(|e| ConnectorError::validation(e.to_string()))?;

    info!(engine = %config.query_engine, "creating graph connector");
    let connector: Box<dyn GraphConnector> = match config.query_engine {
        QueryEngine::Gremlin => Box::new(GremlinConnector::new(transport, config)),
        QueryEngine::OpenCypher => Box::new(OpenCypherConnector::new(transport, config)),
        QueryEngine::Sparql => Box::new(SparqlConnector::new(transport, config)),
    };
    Ok(connector)
}
