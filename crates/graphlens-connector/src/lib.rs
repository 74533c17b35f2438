//! # graphlens connectors
//!
//! Executes compiled queries against a graph backend through an injected
//! [`QueryTransport`](graphlens_core::QueryTransport), validates the
//! response and maps it into the shared vertex/edge model.
//!
//! ```text
//! request ─> compiler ─> RequestCache ─miss─> transport ─> validate ─> mapper
//!                              └──hit──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gremlin`]: GraphSON decoding and mapping
//! - [`opencypher`]: `~id` / `~labels` row decoding and mapping
//! - [`sparql`]: binding decoding, triple aggregation and the blank-node registry
//! - [`executor`]: cache-aware, cancellable query execution
//! - [`factory`]: pick a connector from a [`ConnectionConfig`](graphlens_config::ConnectionConfig)
//!
//! ## Example
//!
//! ```rust,no_run
//! use graphlens_config::{ConnectionConfig, QueryEngine};
//! use graphlens_connector::connector_from_config;
//! use graphlens_core::{CancellationToken, NeighborsRequest, QueryTransport};
//! use std::sync::Arc;
//!
//! async fn expand(transport: Arc<dyn QueryTransport>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::for_engine(QueryEngine::Gremlin);
//!     let connector = connector_from_config(&config, transport)?;
//!     let response = connector
//!         .fetch_neighbors(&NeighborsRequest::new("1"), &CancellationToken::new())
//!         .await?;
//!     println!("{} neighbors", response.vertices.len());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod connector;
pub mod error;
pub mod executor;
pub mod factory;
pub mod gremlin;
pub mod opencypher;
mod schema;
pub mod sparql;

pub use connector::GraphConnector;
pub use error::{ConnectorError, ConnectorResult};
pub use executor::QueryExecutor;
pub use factory::connector_from_config;
pub use gremlin::GremlinConnector;
pub use opencypher::OpenCypherConnector;
pub use sparql::{BlankNodeItem, BlankNodeRegistry, SparqlConnector};
