//! The operation surface every backend facade implements

use crate::error::ConnectorResult;
use crate::sparql::BlankNodeItem;
use async_trait::async_trait;
use graphlens_core::{
    CancellationToken, CountsByTypeRequest, CountsByTypeResponse, EdgeConnection,
    EdgeConnectionsRequest, EdgeDetailsRequest, EdgeDetailsResponse, KeywordSearchRequest,
    KeywordSearchResponse, NeighborsCountRequest, NeighborsCountResponse, NeighborsRequest,
    NeighborsResponse, QueryEngine, RawQueryRequest, RawQueryResponse, SchemaResponse, Vertex,
    VertexDetailsRequest, VertexDetailsResponse, VertexId,
};
use graphlens_query::literal::split_all_types;
use std::collections::BTreeMap;
use tracing::warn;

/// A connection to one graph database
///
/// Every operation short-circuits trivially empty input without touching
/// the transport, and accepts a token that aborts the in-flight request.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    fn engine(&self) -> QueryEngine;

    /// Vertex and edge types with totals, sampled attributes and connections
    async fn fetch_schema(&self, cancel: &CancellationToken) -> ConnectorResult<SchemaResponse>;

    async fn fetch_vertex_counts_by_type(
        &self,
        request: &CountsByTypeRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<CountsByTypeResponse>;

    async fn fetch_neighbors(
        &self,
        request: &NeighborsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NeighborsResponse>;

    async fn neighbor_counts(
        &self,
        request: &NeighborsCountRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NeighborsCountResponse>;

    async fn keyword_search(
        &self,
        request: &KeywordSearchRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<KeywordSearchResponse>;

    async fn vertex_details(
        &self,
        request: &VertexDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<VertexDetailsResponse>;

    async fn edge_details(
        &self,
        request: &EdgeDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<EdgeDetailsResponse>;

    /// Execute a user-supplied query and map whatever comes back
    async fn raw_query(
        &self,
        request: &RawQueryRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<RawQueryResponse>;

    /// Connections of the requested edge types, or of every type when empty
    async fn fetch_edge_connections(
        &self,
        request: &EdgeConnectionsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>>;

    /// Drop cached responses and any per-session state
    fn reset_session(&self);

    /// Snapshot of a discovered blank node; only RDF backends have them
    fn blank_node(&self, _id: &VertexId) -> Option<BlankNodeItem> {
        None
    }
}

/// Log a bulk lookup that found fewer entities than requested
pub(crate) fn warn_if_partial(operation: &'static str, requested: usize, found: usize) {
    if found < requested {
        warn!(
            operation,
            requested,
            found,
            missing = requested - found,
            "bulk request returned fewer entities than requested"
        );
    }
}

/// Neighbor totals per type
///
/// A vertex counts once towards every type it has, compound `a::b` types
/// towards each of their labels, and once towards the total.
pub(crate) fn count_by_type<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> NeighborsCountResponse {
    let mut counts = BTreeMap::new();
    let mut total_count = 0;
    for vertex in vertices {
        total_count += 1;
        for label in split_all_types(&vertex.types) {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }
    NeighborsCountResponse {
        total_count,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_by_type_splits_compound_labels() {
        let vertices = vec![
            Vertex::new("1", "airport"),
            Vertex::new("2", "airport::hub"),
            Vertex::fragment("3"),
        ];
        let response = count_by_type(&vertices);
        assert_eq!(response.total_count, 3);
        assert_eq!(response.counts.get("airport"), Some(&2));
        assert_eq!(response.counts.get("hub"), Some(&1));
    }

    #[test]
    fn test_count_by_type_counts_every_type_once() {
        let vertices = vec![
            Vertex::with_types("1", vec!["airport".into(), "hub".into(), "airport::hub".into()]),
            Vertex::new("2", "hub"),
        ];
        let response = count_by_type(&vertices);
        assert_eq!(response.total_count, 2);
        assert_eq!(response.counts.get("airport"), Some(&1));
        assert_eq!(response.counts.get("hub"), Some(&2));
    }
}
