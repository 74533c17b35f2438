//! openCypher connector

pub mod mapper;
pub mod response;

use crate::connector::{warn_if_partial, GraphConnector};
use crate::error::{ConnectorError, ConnectorResult};
use crate::executor::QueryExecutor;
use crate::schema::{self, AttributeSampler};
use async_trait::async_trait;
use graphlens_config::{ConnectionConfig, SchemaDiscoveryConfig};
use graphlens_core::{
    BatchRunner, CancellationToken, CountsByTypeRequest, CountsByTypeResponse, EdgeConnection,
    EdgeConnectionsRequest, EdgeDetailsRequest, EdgeDetailsResponse, KeywordSearchRequest,
    KeywordSearchResponse, NeighborsCountRequest, NeighborsCountResponse, NeighborsRequest,
    NeighborsResponse, QueryEngine, QueryTransport, RawQueryRequest, RawQueryResponse,
    RequestCache, SchemaResponse, VertexDetailsRequest, VertexDetailsResponse,
};
use graphlens_query::literal::split_types;
use graphlens_query::{OpenCypherCompiler, QueryCompiler};
use response::Row;
use std::sync::Arc;
use tracing::debug;

pub struct OpenCypherConnector {
    compiler: OpenCypherCompiler,
    executor: QueryExecutor,
    batch: BatchRunner,
    schema: SchemaDiscoveryConfig,
}

impl OpenCypherConnector {
    pub fn new(transport: Arc<dyn QueryTransport>, config: &ConnectionConfig) -> Self {
        Self {
            compiler: OpenCypherCompiler::new(),
            executor: QueryExecutor::new(
                QueryEngine::OpenCypher,
                transport,
                RequestCache::new(&config.cache),
            ),
            batch: BatchRunner::from_config(&config.batch),
            schema: config.schema.clone(),
        }
    }

    pub fn cache(&self) -> &RequestCache {
        self.executor.cache()
    }

    async fn fetch(
        &self,
        operation: &'static str,
        query: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<Row>> {
        self.executor
            .fetch_decoded(operation, query, cancel, response::rows)
            .await
    }
}

#[async_trait]
impl GraphConnector for OpenCypherConnector {
    fn engine(&self) -> QueryEngine {
        QueryEngine::OpenCypher
    }

    async fn fetch_schema(&self, cancel: &CancellationToken) -> ConnectorResult<SchemaResponse> {
        let vertex_rows = self
            .fetch("vertexLabelCounts", &self.compiler.vertex_label_counts(), cancel)
            .await?;
        let edge_rows = self
            .fetch("edgeLabelCounts", &self.compiler.edge_label_counts(), cancel)
            .await?;
        let vertex_counts = mapper::label_counts(&vertex_rows, "label")?;
        let edge_counts = mapper::label_counts(&edge_rows, "label")?;
        let sample_limit = self.schema.sample_limit;

        let vertices = self
            .batch
            .try_run(vertex_counts, |(label, total)| async move {
                let query = self.compiler.vertex_samples(&label, sample_limit);
                let rows = self.fetch("vertexSamples", &query, cancel).await?;
                let mut sampler = AttributeSampler::default();
                for vertex in mapper::vertices(&rows, "v")? {
                    sampler.observe(&vertex.attributes);
                }
                Ok::<_, ConnectorError>(schema::vertex_type(label, total, sampler.into_attributes()))
            })
            .await?;

        let edges = self
            .batch
            .try_run(edge_counts, |(label, total)| async move {
                let query = self.compiler.edge_samples(&label, sample_limit);
                let rows = self.fetch("edgeSamples", &query, cancel).await?;
                let mut sampler = AttributeSampler::default();
                for edge in mapper::edges(&rows, "e")? {
                    sampler.observe(&edge.attributes);
                }
                Ok::<_, ConnectorError>(schema::edge_type(label, total, sampler.into_attributes()))
            })
            .await?;

        let connections = if self.schema.discover_edge_connections {
            let rows = self
                .fetch("edgeConnections", &self.compiler.edge_connections(&[]), cancel)
                .await?;
            Some(mapper::edge_connections(&rows)?)
        } else {
            None
        };

        debug!(
            vertex_types = vertices.len(),
            edge_types = edges.len(),
            "openCypher schema discovered"
        );
        Ok(schema::assemble(vertices, edges, connections))
    }

    async fn fetch_vertex_counts_by_type(
        &self,
        request: &CountsByTypeRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<CountsByTypeResponse> {
        if split_types(&request.label).is_empty() {
            return Ok(CountsByTypeResponse::default());
        }
        let query = self.compiler.vertex_count_by_type(&request.label)?;
        let rows = self.fetch("vertexCountsByType", &query, cancel).await?;
        let total = match rows.first() {
            Some(row) => response::count(row, "total")?,
            None => 0,
        };
        Ok(CountsByTypeResponse { total })
    }

    async fn fetch_neighbors(
        &self,
        request: &NeighborsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NeighborsResponse> {
        if request.is_trivially_empty() {
            return Ok(NeighborsResponse::default());
        }
        let query = self.compiler.neighbors(request)?;
        let rows = self.fetch("fetchNeighbors", &query, cancel).await?;
        let (vertices, edges) = mapper::neighbors(&rows)?;
        Ok(NeighborsResponse { vertices, edges })
    }

    async fn neighbor_counts(
        &self,
        request: &NeighborsCountRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NeighborsCountResponse> {
        if request.vertex_id.is_none() {
            return Ok(NeighborsCountResponse::default());
        }
        let query = self.compiler.neighbor_counts(request)?;
        let rows = self.fetch("neighborCounts", &query, cancel).await?;

        let mut response = NeighborsCountResponse::default();
        for (labels, count) in mapper::label_counts(&rows, "vertexLabels")? {
            response.total_count += count;
            for label in split_types(&labels) {
                *response.counts.entry(label.to_string()).or_insert(0) += count;
            }
        }
        Ok(response)
    }

    async fn keyword_search(
        &self,
        request: &KeywordSearchRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<KeywordSearchResponse> {
        let query = self.compiler.keyword_search(request)?;
        let rows = self.fetch("keywordSearch", &query, cancel).await?;
        Ok(KeywordSearchResponse {
            vertices: mapper::vertices(&rows, "v")?,
            ..KeywordSearchResponse::default()
        })
    }

    async fn vertex_details(
        &self,
        request: &VertexDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<VertexDetailsResponse> {
        if request.vertex_ids.is_empty() {
            return Ok(VertexDetailsResponse::default());
        }
        let query = self.compiler.vertex_details(&request.vertex_ids)?;
        let rows = self.fetch("vertexDetails", &query, cancel).await?;
        let vertices = mapper::vertices(&rows, "v")?;
        warn_if_partial("vertexDetails", request.vertex_ids.len(), vertices.len());
        Ok(VertexDetailsResponse { vertices })
    }

    async fn edge_details(
        &self,
        request: &EdgeDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<EdgeDetailsResponse> {
        if request.edge_ids.is_empty() {
            return Ok(EdgeDetailsResponse::default());
        }
        let query = self.compiler.edge_details(&request.edge_ids)?;
        let rows = self.fetch("edgeDetails", &query, cancel).await?;
        let edges = mapper::edges(&rows, "e")?;
        warn_if_partial("edgeDetails", request.edge_ids.len(), edges.len());
        Ok(EdgeDetailsResponse { edges })
    }

    async fn raw_query(
        &self,
        request: &RawQueryRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<RawQueryResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(RawQueryResponse::default());
        }
        let rows = self.fetch("rawQuery", query, cancel).await?;
        mapper::raw(&rows)
    }

    async fn fetch_edge_connections(
        &self,
        request: &EdgeConnectionsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>> {
        let query = self.compiler.edge_connections(&request.edge_types);
        let rows = self.fetch("edgeConnections", &query, cancel).await?;
        mapper::edge_connections(&rows)
    }

    fn reset_session(&self) {
        self.executor.cache().clear();
    }
}
