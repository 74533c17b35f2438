//! SPARQL connector
//!
//! Entity queries return `(subject, predicate, object)` bindings that the
//! [`mapper`] aggregates. Blank nodes found in neighbor or search results
//! are remembered in the [`BlankNodeRegistry`]; expanding or counting a
//! blank node's neighbors goes through the registry instead of a regular
//! neighbors query, since a blank node cannot be addressed by label.

pub mod blank_nodes;
pub mod literal;
pub mod mapper;
pub mod response;

pub use blank_nodes::{BlankNodeItem, BlankNodeRegistry, Locator, ResolvedNeighborhood};

use crate::connector::{warn_if_partial, GraphConnector};
use crate::error::{ConnectorError, ConnectorResult};
use crate::executor::QueryExecutor;
use crate::schema::{self, AttributeSampler};
use async_trait::async_trait;
use graphlens_config::{ConnectionConfig, SchemaDiscoveryConfig};
use graphlens_core::{
    BatchRunner, Bundle, CancellationToken, CountsByTypeRequest, CountsByTypeResponse, Edge,
    EdgeConnection, EdgeConnectionsRequest, EdgeDetailsRequest, EdgeDetailsResponse, EdgeId,
    EntityValue, IdentityError, KeywordSearchRequest, KeywordSearchResponse, MappedQueryResults,
    NeighborsCountRequest, NeighborsCountResponse, NeighborsRequest, NeighborsResponse,
    QueryEngine, QueryTransport, RawQueryRequest, RawQueryResponse, RdfEdgeId, RequestCache,
    Scalar, SchemaResponse, Vertex, VertexDetailsRequest, VertexDetailsResponse, VertexId,
};
use graphlens_query::literal::{is_iri, split_types};
use graphlens_query::{QueryCompiler, SparqlCompiler, RDFS_RESOURCE, RDF_TYPE};
use mapper::{map_triples, promote};
use response::{Binding, RdfTerm, SparqlResponse, Triple};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SparqlConnector {
    compiler: SparqlCompiler,
    executor: QueryExecutor,
    batch: BatchRunner,
    schema: SchemaDiscoveryConfig,
    blank_nodes: BlankNodeRegistry,
}

fn is_iri_id(id: &VertexId) -> bool {
    id.as_str().map(is_iri).unwrap_or(false)
}

fn decode_triples(body: &serde_json::Value) -> ConnectorResult<MappedQueryResults> {
    let rows = response::decode_rows(body)?;
    Ok(map_triples(&response::triples(&rows)?))
}

fn scalar_value(term: &RdfTerm) -> EntityValue {
    match term {
        RdfTerm::Literal {
            value, datatype, ..
        } => literal::coerce(value, datatype.as_deref()),
        resource => EntityValue::String(resource.value().to_string()),
    }
}

/// One-hop rows of a located blank node with its label replaced by `id`
fn relabeled_triples(rows: &[&Binding], label: &str, id: &VertexId) -> ConnectorResult<Vec<Triple>> {
    let node = RdfTerm::blank(id.to_string());
    let relabel = |term: &RdfTerm| match term {
        RdfTerm::BlankNode { value } if value == label => node.clone(),
        other => other.clone(),
    };
    rows.iter()
        .map(|row| -> ConnectorResult<Triple> {
            let triple = Triple::from_row(row)?;
            Ok(Triple {
                subject: relabel(&triple.subject),
                predicate: triple.predicate,
                object: relabel(&triple.object),
            })
        })
        .collect()
}

/// Whether relabeled one-hop triples agree with everything seen of the node
fn fits(locator: &Locator, id: &VertexId, triples: &[Triple]) -> bool {
    let node = RdfTerm::blank(id.to_string());
    let states = |predicate: &str, object: &dyn Fn(&RdfTerm) -> bool| {
        triples
            .iter()
            .any(|t| t.subject == node && t.predicate == predicate && object(&t.object))
    };

    let typed = locator
        .vertex
        .types
        .iter()
        .filter(|t| t.as_str() != RDFS_RESOURCE)
        .all(|t| states(RDF_TYPE, &|o| o.is_resource() && o.value() == t.as_str()));
    let described = locator
        .vertex
        .attributes
        .iter()
        .all(|(name, value)| states(name.as_str(), &|o| !o.is_resource() && scalar_value(o) == *value));
    if !(typed && described) {
        return false;
    }

    let edges: HashSet<EdgeId> = map_triples(triples).edges.into_iter().map(|e| e.id).collect();
    locator.known_edges.iter().all(|e| edges.contains(e))
}

impl SparqlConnector {
    pub fn new(transport: Arc<dyn QueryTransport>, config: &ConnectionConfig) -> Self {
        Self {
            compiler: SparqlCompiler::new(),
            executor: QueryExecutor::new(
                QueryEngine::Sparql,
                transport,
                RequestCache::new(&config.cache),
            ),
            batch: BatchRunner::from_config(&config.batch),
            schema: config.schema.clone(),
            blank_nodes: BlankNodeRegistry::new(&config.blank_nodes),
        }
    }

    pub fn cache(&self) -> &RequestCache {
        self.executor.cache()
    }

    pub fn blank_nodes(&self) -> &BlankNodeRegistry {
        &self.blank_nodes
    }

    async fn fetch_rows(
        &self,
        operation: &'static str,
        query: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<Binding>> {
        self.executor
            .fetch_decoded(operation, query, cancel, response::decode_rows)
            .await
    }

    async fn fetch_triples(
        &self,
        operation: &'static str,
        query: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<MappedQueryResults> {
        self.executor
            .fetch_decoded(operation, query, cancel, decode_triples)
            .await
    }

    fn register_blank_nodes<'a>(
        &self,
        vertices: impl IntoIterator<Item = &'a Vertex>,
        edges: &[Edge],
        template: &str,
    ) {
        for vertex in vertices.into_iter().filter(|v| v.is_blank_node) {
            self.blank_nodes.discover(vertex.clone(), template, edges);
        }
    }

    async fn blank_neighborhood(
        &self,
        id: &VertexId,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Arc<ResolvedNeighborhood>> {
        self.blank_nodes
            .resolve(id, |locator| self.load_neighborhood(id, locator, cancel))
            .await
    }

    /// Run the one-hop query for a blank node
    ///
    /// The locator may find several blank nodes, and labels are only stable
    /// within one response. The located node whose rows agree with what was
    /// seen of `id` is taken; its own label only breaks ties. When no single
    /// node fits, resolution fails and nothing is memoized.
    async fn load_neighborhood(
        &self,
        id: &VertexId,
        locator: Locator,
        cancel: &CancellationToken,
    ) -> ConnectorResult<ResolvedNeighborhood> {
        let query = self.compiler.blank_node_neighbors(&locator.template);
        let rows = self.fetch_rows("blankNodeNeighbors", &query, cancel).await?;

        let mut by_label: BTreeMap<&str, Vec<&Binding>> = BTreeMap::new();
        for row in &rows {
            if let Some(label) = row.get("bNode") {
                by_label.entry(label.value()).or_default().push(row);
            }
        }

        let mut fitting = Vec::new();
        for (label, rows) in &by_label {
            let triples = relabeled_triples(rows, label, id)?;
            if fits(&locator, id, &triples) {
                fitting.push((*label, triples));
            }
        }

        let own_label = id.to_string();
        let chosen = if fitting.len() == 1 {
            fitting.pop()
        } else {
            let own = fitting.iter().position(|(label, _)| *label == own_label);
            own.map(|i| fitting.swap_remove(i))
        };
        let Some((_, triples)) = chosen else {
            let reason = if by_label.is_empty() {
                "blank node locator found nothing"
            } else {
                "blank node locator is ambiguous"
            };
            warn!(id = %id, located = by_label.len(), fitting = fitting.len(), "{reason}");
            return Err(IdentityError::new(own_label, reason).into());
        };

        let results = map_triples(&triples);
        let mut vertex = None;
        let mut neighbors = Vec::new();
        for candidate in results.vertices {
            if &candidate.id == id {
                vertex = Some(candidate);
            } else {
                neighbors.push(promote(candidate));
            }
        }
        let nested = self.compiler.blank_nodes_near_template(&locator.template);
        self.register_blank_nodes(&neighbors, &results.edges, &nested);

        let edges: Vec<Edge> = results
            .edges
            .into_iter()
            .filter(|e| &e.source_id == id || &e.target_id == id)
            .collect();

        debug!(id = %id, neighbors = neighbors.len(), "blank node resolved");
        Ok(ResolvedNeighborhood {
            vertex,
            neighbors,
            edges,
        })
    }

    /// Full vertices for IRI-identified ids
    async fn iri_vertices(
        &self,
        ids: &[VertexId],
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<Vertex>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.compiler.vertex_details(ids)?;
        let results = self.fetch_triples("vertexDetails", &query, cancel).await?;
        Ok(results.vertices.into_iter().filter(|v| !v.is_fragment).collect())
    }

    async fn class_attributes(
        &self,
        class: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<graphlens_core::AttributeConfig>> {
        let query = self.compiler.class_predicates(class, self.schema.sample_limit)?;
        let rows = self.fetch_rows("classPredicates", &query, cancel).await?;
        let mut sampler = AttributeSampler::default();
        for row in &rows {
            let predicate = response::iri(row, "predicate")?;
            let datatype = row.get("datatype").map(RdfTerm::value);
            sampler.observe_typed(predicate, literal::data_type(datatype));
        }
        Ok(sampler.into_attributes())
    }

    async fn predicate_counts(&self, cancel: &CancellationToken) -> ConnectorResult<Vec<(String, u64)>> {
        let rows = self
            .fetch_rows("predicateCounts", &self.compiler.predicate_counts(), cancel)
            .await?;
        rows.iter()
            .map(|row| -> ConnectorResult<(String, u64)> {
                Ok((response::iri(row, "predicate")?.to_string(), response::count(row, "count")?))
            })
            .collect()
    }

    async fn connections_of(
        &self,
        predicates: Vec<String>,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>> {
        let per_predicate = self
            .batch
            .try_run(predicates, |predicate| async move {
                let query = self.compiler.predicate_connections(&predicate)?;
                let rows = self.fetch_rows("predicateConnections", &query, cancel).await?;
                rows.iter()
                    .map(|row| -> ConnectorResult<EdgeConnection> {
                        Ok(EdgeConnection {
                            source_vertex_type: response::iri(row, "sourceClass")?.to_string(),
                            edge_type: predicate.clone(),
                            target_vertex_type: response::iri(row, "targetClass")?.to_string(),
                            count: Some(response::count(row, "count")?),
                        })
                    })
                    .collect::<ConnectorResult<Vec<_>>>()
            })
            .await?;
        let mut connections: Vec<EdgeConnection> = per_predicate.into_iter().flatten().collect();
        connections.sort();
        Ok(connections)
    }
}

#[async_trait]
impl GraphConnector for SparqlConnector {
    fn engine(&self) -> QueryEngine {
        QueryEngine::Sparql
    }

    async fn fetch_schema(&self, cancel: &CancellationToken) -> ConnectorResult<SchemaResponse> {
        let class_rows = self
            .fetch_rows("classCounts", &self.compiler.class_counts(), cancel)
            .await?;
        let classes = class_rows
            .iter()
            .map(|row| -> ConnectorResult<(String, u64)> {
                Ok((response::iri(row, "class")?.to_string(), response::count(row, "count")?))
            })
            .collect::<ConnectorResult<Vec<_>>>()?;

        let vertices = self
            .batch
            .try_run(classes, |(class, total)| async move {
                let attributes = self.class_attributes(&class, cancel).await?;
                Ok::<_, ConnectorError>(schema::vertex_type(class, total, attributes))
            })
            .await?;

        let predicates = self.predicate_counts(cancel).await?;
        let edges = predicates
            .iter()
            .map(|(predicate, total)| schema::edge_type(predicate.clone(), *total, Vec::new()))
            .collect();

        let connections = if self.schema.discover_edge_connections {
            let names = predicates.into_iter().map(|(p, _)| p).collect();
            Some(self.connections_of(names, cancel).await?)
        } else {
            None
        };

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
        let rows = self.fetch_rows("vertexCountsByType", &query, cancel).await?;
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
        let Some(source) = request.vertex_id.as_ref().filter(|_| !request.is_trivially_empty()) else {
            return Ok(NeighborsResponse::default());
        };

        if self.blank_nodes.contains(source) {
            let resolved = self.blank_neighborhood(source, cancel).await?;
            return Ok(resolved.filter(request));
        }
        if !is_iri_id(source) {
            return Err(IdentityError::new(source.to_string(), "unknown blank node").into());
        }

        let query = self.compiler.neighbors(request)?;
        let results = self.fetch_triples("fetchNeighbors", &query, cancel).await?;

        let vertices: Vec<Vertex> = results
            .vertices
            .into_iter()
            .filter(|v| &v.id != source && !request.excluded_vertices.contains(&v.id))
            .map(promote)
            .collect();
        let kept: HashSet<&VertexId> = vertices.iter().map(|v| &v.id).collect();
        let edges: Vec<Edge> = results
            .edges
            .into_iter()
            .filter(|e| kept.contains(&e.source_id) || kept.contains(&e.target_id))
            .collect();

        let template = self.compiler.blank_nodes_near(source)?;
        self.register_blank_nodes(&vertices, &edges, &template);

        Ok(NeighborsResponse { vertices, edges })
    }

    async fn neighbor_counts(
        &self,
        request: &NeighborsCountRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NeighborsCountResponse> {
        let Some(source) = request.vertex_id.as_ref() else {
            return Ok(NeighborsCountResponse::default());
        };

        if self.blank_nodes.contains(source) {
            let resolved = self.blank_neighborhood(source, cancel).await?;
            return Ok(resolved.counts_for(request));
        }
        if !is_iri_id(source) {
            return Err(IdentityError::new(source.to_string(), "unknown blank node").into());
        }

        let query = self.compiler.neighbor_counts(request)?;
        let rows = self.fetch_rows("neighborCounts", &query, cancel).await?;

        // A neighbor with several classes appears under each of them, so
        // the total comes from its own row
        let mut counts = BTreeMap::new();
        let mut total = None;
        for row in &rows {
            let count = response::count(row, "count")?;
            if row.contains_key("class") {
                let class = response::resource(row, "class")?.value().to_string();
                *counts.entry(class).or_insert(0) += count;
            } else {
                total = Some(count);
            }
        }
        let total_count = match total {
            Some(total) => total,
            None if counts.is_empty() => 0,
            None => return Err(ConnectorError::validation("neighbor counts carry no total row")),
        };
        Ok(NeighborsCountResponse {
            total_count,
            counts,
        })
    }

    async fn keyword_search(
        &self,
        request: &KeywordSearchRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<KeywordSearchResponse> {
        let query = self.compiler.keyword_search(request)?;
        let results = self.fetch_triples("keywordSearch", &query, cancel).await?;
        let vertices: Vec<Vertex> = results.vertices.into_iter().filter(|v| !v.is_fragment).collect();

        if vertices.iter().any(|v| v.is_blank_node) {
            let template = self.compiler.blank_nodes_matching(request)?;
            self.register_blank_nodes(&vertices, &results.edges, &template);
        }
        Ok(KeywordSearchResponse {
            vertices,
            ..KeywordSearchResponse::default()
        })
    }

    /// Blank nodes are served from the registry, IRIs from the backend
    async fn vertex_details(
        &self,
        request: &VertexDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<VertexDetailsResponse> {
        if request.vertex_ids.is_empty() {
            return Ok(VertexDetailsResponse::default());
        }

        let iri_ids: Vec<VertexId> = request
            .vertex_ids
            .iter()
            .filter(|id| is_iri_id(id))
            .cloned()
            .collect();
        let mut fetched: BTreeMap<VertexId, Vertex> = self
            .iri_vertices(&iri_ids, cancel)
            .await?
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();

        let vertices: Vec<Vertex> = request
            .vertex_ids
            .iter()
            .filter_map(|id| fetched.remove(id).or_else(|| self.blank_nodes.vertex(id)))
            .collect();
        warn_if_partial("vertexDetails", request.vertex_ids.len(), vertices.len());
        Ok(VertexDetailsResponse { vertices })
    }

    /// Edges touching a blank node are served from resolved neighborhoods
    async fn edge_details(
        &self,
        request: &EdgeDetailsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<EdgeDetailsResponse> {
        if request.edge_ids.is_empty() {
            return Ok(EdgeDetailsResponse::default());
        }

        let mut addressable = Vec::new();
        for id in &request.edge_ids {
            let parsed = RdfEdgeId::try_from(id)?;
            if is_iri(&parsed.source) && is_iri(&parsed.target) {
                addressable.push(id.clone());
            }
        }

        let mut found: BTreeMap<EdgeId, Edge> = BTreeMap::new();
        if !addressable.is_empty() {
            let query = self.compiler.edge_details(&addressable)?;
            let results = self.fetch_triples("edgeDetails", &query, cancel).await?;
            found.extend(results.edges.into_iter().map(|e| (e.id.clone(), e)));
        }
        if addressable.len() < request.edge_ids.len() {
            found.extend(self.blank_nodes.resolved_edges().into_iter().map(|e| (e.id.clone(), e)));
        }

        let edges: Vec<Edge> = request
            .edge_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .collect();
        warn_if_partial("edgeDetails", request.edge_ids.len(), edges.len());
        Ok(EdgeDetailsResponse { edges })
    }

    /// ASK answers become one boolean scalar; `subject`/`predicate`/`object`
    /// projections are aggregated like entity queries
    async fn raw_query(
        &self,
        request: &RawQueryRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<RawQueryResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(RawQueryResponse::default());
        }
        let response = self
            .executor
            .fetch_decoded("rawQuery", query, cancel, SparqlResponse::decode)
            .await?;

        let (vars, rows) = match response {
            SparqlResponse::Boolean(answer) => {
                return Ok(MappedQueryResults {
                    scalars: vec![Scalar::new(None, answer)],
                    ..MappedQueryResults::default()
                })
            }
            SparqlResponse::Bindings { vars, rows } => (vars, rows),
        };

        let is_triples = ["subject", "predicate", "object"]
            .iter()
            .all(|v| vars.iter().any(|var| var == v));
        if is_triples {
            return Ok(map_triples(&response::triples(&rows)?));
        }

        let mut results = MappedQueryResults::default();
        for row in &rows {
            let values: Vec<Scalar> = vars
                .iter()
                .filter_map(|var| row.get(var).map(|term| Scalar::named(var.clone(), scalar_value(term))))
                .collect();
            match <[Scalar; 1]>::try_from(values) {
                Ok([scalar]) => results.scalars.push(scalar),
                Err(values) if !values.is_empty() => results.bundles.push(Bundle { name: None, values }),
                Err(_) => {}
            }
        }
        Ok(results)
    }

    async fn fetch_edge_connections(
        &self,
        request: &EdgeConnectionsRequest,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Vec<EdgeConnection>> {
        let predicates = if request.edge_types.is_empty() {
            self.predicate_counts(cancel)
                .await?
                .into_iter()
                .map(|(p, _)| p)
                .collect()
        } else {
            request.edge_types.clone()
        };
        self.connections_of(predicates, cancel).await
    }

    fn reset_session(&self) {
        self.executor.cache().clear();
        self.blank_nodes.clear();
    }

    fn blank_node(&self, id: &VertexId) -> Option<BlankNodeItem> {
        self.blank_nodes.snapshot(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlens_core::test_utils::MockTransport;
    use graphlens_query::RDF_TYPE;
    use serde_json::{json, Value};
    use tracing_test::traced_test;

    const NEIGHBORS: &str = "SELECT DISTINCT ?neighbor WHERE";
    const BLANK_NEIGHBORS: &str = "SELECT ?bNode ?subject";
    const DETAILS: &str = "VALUES ?subject";

    fn uri(value: &str) -> Value {
        json!({ "type": "uri", "value": value })
    }

    fn bnode(value: &str) -> Value {
        json!({ "type": "bnode", "value": value })
    }

    fn lit(value: &str) -> Value {
        json!({ "type": "literal", "value": value })
    }

    fn select(bindings: Vec<Value>) -> Value {
        json!({
            "head": { "vars": ["bNode", "subject", "predicate", "object"] },
            "results": { "bindings": bindings }
        })
    }

    fn spo(subject: Value, predicate: &str, object: Value) -> Value {
        json!({ "subject": subject, "predicate": uri(predicate), "object": object })
    }

    fn blank_row(label: &str, subject: Value, predicate: &str, object: Value) -> Value {
        json!({ "bNode": bnode(label), "subject": subject, "predicate": uri(predicate), "object": object })
    }

    fn transport() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .respond(
                    BLANK_NEIGHBORS,
                    select(vec![
                        // labels are per response; "b9" is the node called "b0" earlier
                        blank_row("b9", bnode("b9"), "http://a/street", lit("Main")),
                        blank_row("b9", uri("http://a/s"), "http://a/address", bnode("b9")),
                        blank_row("b9", uri("http://a/s"), RDF_TYPE, uri("http://a/Airport")),
                    ]),
                )
                .respond(
                    NEIGHBORS,
                    select(vec![
                        spo(uri("http://a/s"), "http://a/address", bnode("b0")),
                        spo(bnode("b0"), "http://a/street", lit("Main")),
                        spo(uri("http://a/s"), "http://a/route", uri("http://a/t")),
                        spo(uri("http://a/t"), RDF_TYPE, uri("http://a/Airport")),
                    ]),
                )
                .respond(
                    DETAILS,
                    select(vec![spo(uri("http://a/t"), RDF_TYPE, uri("http://a/Airport"))]),
                ),
        )
    }

    fn connector(transport: Arc<MockTransport>) -> SparqlConnector {
        SparqlConnector::new(transport, &ConnectionConfig::for_engine(QueryEngine::Sparql))
    }

    #[tokio::test]
    async fn test_neighbors_register_blank_nodes() {
        let transport = transport();
        let connector = connector(transport.clone());
        let cancel = CancellationToken::new();

        let response = connector
            .fetch_neighbors(&NeighborsRequest::new("http://a/s"), &cancel)
            .await
            .unwrap();

        assert_eq!(response.vertices.len(), 2);
        assert!(response.vertices.iter().all(|v| v.id != VertexId::from("http://a/s")));
        assert_eq!(response.edges.len(), 2);

        let item = connector.blank_node(&VertexId::from("b0")).unwrap();
        assert!(item.sub_query_template.contains("isBlank(?bNode)"));
        assert!(item.neighbors.is_none());
    }

    #[tokio::test]
    async fn test_blank_node_expansion_resolves_once() {
        let transport = transport();
        let connector = connector(transport.clone());
        let cancel = CancellationToken::new();
        connector
            .fetch_neighbors(&NeighborsRequest::new("http://a/s"), &cancel)
            .await
            .unwrap();

        let expanded = connector
            .fetch_neighbors(&NeighborsRequest::new("b0"), &cancel)
            .await
            .unwrap();
        assert_eq!(expanded.vertices.len(), 1);
        assert_eq!(expanded.vertices[0].id, VertexId::from("http://a/s"));
        assert_eq!(
            expanded.edges[0].id,
            EdgeId::from("http://a/s-[http://a/address]->b0")
        );

        let counts = connector
            .neighbor_counts(&NeighborsCountRequest::new("b0"), &cancel)
            .await
            .unwrap();
        assert_eq!(counts.total_count, 1);
        assert_eq!(counts.counts["http://a/Airport"], 1);

        let filtered = connector
            .fetch_neighbors(
                &NeighborsRequest::new("b0").with_vertex_types(["http://a/Route"]),
                &cancel,
            )
            .await
            .unwrap();
        assert!(filtered.vertices.is_empty());
        assert_eq!(transport.calls_matching(BLANK_NEIGHBORS), 1);

        let item = connector.blank_node(&VertexId::from("b0")).unwrap();
        assert_eq!(item.neighbors.map(|n| n.vertices.len()), Some(1));
        assert_eq!(item.vertex.attributes["http://a/street"], EntityValue::from("Main"));
    }

    #[tokio::test]
    async fn test_unknown_blank_source_is_rejected() {
        let transport = transport();
        let connector = connector(transport.clone());

        let err = connector
            .fetch_neighbors(&NeighborsRequest::new("b42"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Identity(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_vertex_details_mix_blank_and_iri() {
        let transport = transport();
        let connector = connector(transport.clone());
        let cancel = CancellationToken::new();
        connector
            .fetch_neighbors(&NeighborsRequest::new("http://a/s"), &cancel)
            .await
            .unwrap();

        let request = VertexDetailsRequest {
            vertex_ids: vec!["b0".into(), "http://a/t".into(), "b77".into()],
        };
        let response = connector.vertex_details(&request, &cancel).await.unwrap();

        let ids: Vec<_> = response.vertices.iter().map(|v| v.id.to_string()).collect();
        assert_eq!(ids, vec!["b0", "http://a/t"]);
        assert!(logs_contain("bulk request returned fewer entities than requested"));
    }

    #[tokio::test]
    async fn test_raw_ask_and_scalar_projection() {
        let transport = Arc::new(
            MockTransport::new()
                .respond("ASK", json!({ "head": {}, "boolean": false }))
                .respond(
                    "COUNT",
                    json!({
                        "head": { "vars": ["count"] },
                        "results": { "bindings": [{ "count": {
                            "type": "literal",
                            "value": "7",
                            "datatype": "http://www.w3.org/2001/XMLSchema#integer"
                        } }] }
                    }),
                ),
        );
        let connector = connector(transport);
        let cancel = CancellationToken::new();

        let ask = RawQueryRequest { query: "ASK { ?s ?p ?o }".into() };
        let answer = connector.raw_query(&ask, &cancel).await.unwrap();
        assert_eq!(answer.scalars, vec![Scalar::new(None, false)]);

        let count = RawQueryRequest {
            query: "SELECT (COUNT(*) AS ?count) WHERE { ?s ?p ?o }".into(),
        };
        let counted = connector.raw_query(&count, &cancel).await.unwrap();
        assert_eq!(counted.scalars, vec![Scalar::named("count", 7.0)]);
    }

    #[tokio::test]
    async fn test_reset_session_forgets_blank_nodes() {
        let transport = transport();
        let connector = connector(transport.clone());
        let cancel = CancellationToken::new();
        connector
            .fetch_neighbors(&NeighborsRequest::new("http://a/s"), &cancel)
            .await
            .unwrap();
        assert!(!connector.blank_nodes().is_empty());

        connector.reset_session();
        assert!(connector.blank_nodes().is_empty());
        connector
            .fetch_neighbors(&NeighborsRequest::new("http://a/s"), &cancel)
            .await
            .unwrap();
        assert_eq!(transport.calls_matching(NEIGHBORS), 2);
    }
}
