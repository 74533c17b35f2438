//! Gremlin connector

pub mod graphson;
pub mod mapper;

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
use graphlens_query::{GremlinCompiler, QueryCompiler};
use graphson::{decode_results, GValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct GremlinConnector {
    compiler: GremlinCompiler,
    executor: QueryExecutor,
    batch: BatchRunner,
    schema: SchemaDiscoveryConfig,
}

impl GremlinConnector {
    pub fn new(transport: Arc<dyn QueryTransport>, config: &ConnectionConfig) -> Self {
        Self {
            compiler: GremlinCompiler::new(config.id_type),
            executor: QueryExecutor::new(
                QueryEngine::Gremlin,
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
    ) -> ConnectorResult<Vec<GValue>> {
        self.executor
            .fetch_decoded(operation, query, cancel, decode_results)
            .await
    }

    async fn label_counts(
        &self,
        query: String,
        cancel: &CancellationToken,
    ) -> ConnectorResult<BTreeMap<String, u64>> {
        let items = self.fetch("labelCounts", &query, cancel).await?;
        mapper::group_counts(&items)
    }

    async fn connections_of(
        &self,
        edge_types: Vec<String>,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>> {
        let per_type = self
            .batch
            .try_run(edge_types, |edge_type| async move {
                let query = self.compiler.edge_connections(&edge_type);
                let items = self.fetch("edgeConnections", &query, cancel).await?;
                mapper::edge_connections(&edge_type, &items)
            })
            .await?;
        Ok(per_type.into_iter().flatten().collect())
    }
}

#[async_trait]
impl GraphConnector for GremlinConnector {
    fn engine(&self) -> QueryEngine {
        QueryEngine::Gremlin
    }

    async fn fetch_schema(&self, cancel: &CancellationToken) -> ConnectorResult<SchemaResponse> {
        let vertex_counts = self
            .label_counts(self.compiler.vertex_label_counts(), cancel)
            .await?;
        let edge_counts = self
            .label_counts(self.compiler.edge_label_counts(), cancel)
            .await?;
        let sample_limit = self.schema.sample_limit;

        let vertices = self
            .batch
            .try_run(vertex_counts, |(label, total)| async move {
                let query = self.compiler.vertex_samples(&label, sample_limit);
                let samples = mapper::vertices(&self.fetch("vertexSamples", &query, cancel).await?)?;
                let mut sampler = AttributeSampler::default();
                for vertex in &samples {
                    sampler.observe(&vertex.attributes);
                }
                Ok::<_, ConnectorError>(schema::vertex_type(label, total, sampler.into_attributes()))
            })
            .await?;

        let edges = self
            .batch
            .try_run(edge_counts.clone(), |(label, total)| async move {
                let query = self.compiler.edge_samples(&label, sample_limit);
                let samples = mapper::edges(&self.fetch("edgeSamples", &query, cancel).await?)?;
                let mut sampler = AttributeSampler::default();
                for edge in &samples {
                    sampler.observe(&edge.attributes);
                }
                Ok::<_, ConnectorError>(schema::edge_type(label, total, sampler.into_attributes()))
            })
            .await?;

        let connections = if self.schema.discover_edge_connections {
            Some(self.connections_of(edge_counts.into_keys().collect(), cancel).await?)
        } else {
            None
        };

        debug!(
            vertex_types = vertices.len(),
            edge_types = edges.len(),
            "gremlin schema discovered"
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
        let items = self.fetch("vertexCountsByType", &query, cancel).await?;
        Ok(CountsByTypeResponse {
            total: mapper::single_count(&items)?,
        })
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
        let items = self.fetch("fetchNeighbors", &query, cancel).await?;
        let (vertices, edges) = mapper::neighbors(&items)?;
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
        let items = self.fetch("neighborCounts", &query, cancel).await?;

        let mut response = NeighborsCountResponse::default();
        for (label, count) in mapper::group_counts(&items)? {
            response.total_count += count;
            for part in split_types(&label) {
                *response.counts.entry(part.to_string()).or_insert(0) += count;
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
        let items = self.fetch("keywordSearch", &query, cancel).await?;
        Ok(KeywordSearchResponse {
            vertices: mapper::vertices(&items)?,
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
        let items = self.fetch("vertexDetails", &query, cancel).await?;
        let vertices = mapper::vertices(&items)?;
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
        let items = self.fetch("edgeDetails", &query, cancel).await?;
        let edges = mapper::edges(&items)?;
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
        let items = self.fetch("rawQuery", query, cancel).await?;
        Ok(mapper::raw(&items))
    }

    async fn fetch_edge_connections(
        &self,
        request: &EdgeConnectionsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>> {
        let edge_types = if request.edge_types.is_empty() {
            self.label_counts(self.compiler.edge_label_counts(), cancel)
                .await?
                .into_keys()
                .collect()
        } else {
            request.edge_types.clone()
        };
        let mut connections = self.connections_of(edge_types, cancel).await?;
        connections.sort();
        Ok(connections)
    }

    fn reset_session(&self) {
        self.executor.cache().clear();
    }
}
