//! Triple aggregation
//!
//! Each `(subject, predicate, object)` binding is one of:
//!
//! - a type assertion (`rdf:type` with a resource object), adding a type
//! - an attribute (literal object), adding a coerced attribute
//! - an edge (resource object), adding an edge with a synthetic
//!   `{source}-[{predicate}]->{target}` id and fragments for its endpoints
//!
//! Repeated bindings for a subject merge into one vertex. Blank-node terms
//! tag the vertex they produce.

use super::literal::coerce;
use super::response::{RdfTerm, Triple};
use graphlens_core::{Edge, EntityCollector, MappedQueryResults, RdfEdgeId, Vertex, VertexId};
use graphlens_query::{RDFS_RESOURCE, RDF_TYPE};

#[derive(Debug, Default)]
pub struct TripleMapper {
    collector: EntityCollector,
}

fn vertex_id(term: &RdfTerm) -> VertexId {
    VertexId::from(term.value())
}

fn tag(vertex: Vertex, term: &RdfTerm) -> Vertex {
    if term.is_blank() {
        vertex.blank()
    } else {
        vertex
    }
}

impl TripleMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, triple: &Triple) {
        let Triple {
            subject,
            predicate,
            object,
        } = triple;

        match object {
            RdfTerm::Literal {
                value, datatype, ..
            } => {
                let vertex = Vertex::with_types(vertex_id(subject), Vec::new())
                    .with_attribute(predicate.clone(), coerce(value, datatype.as_deref()));
                self.collector.add_vertex(tag(vertex, subject));
            }
            resource if predicate == RDF_TYPE => {
                let vertex = Vertex::with_types(vertex_id(subject), vec![resource.value().to_string()]);
                self.collector.add_vertex(tag(vertex, subject));
            }
            resource => {
                let id = RdfEdgeId::new(subject.value(), predicate.clone(), resource.value());
                self.collector.add_edge(Edge::new(
                    id.to_edge_id(),
                    predicate.clone(),
                    vertex_id(subject),
                    vertex_id(resource),
                ));
                self.collector
                    .add_vertex(tag(Vertex::fragment(vertex_id(subject)), subject));
                self.collector
                    .add_vertex(tag(Vertex::fragment(vertex_id(resource)), resource));
            }
        }
    }

    pub fn add_all<'a>(&mut self, triples: impl IntoIterator<Item = &'a Triple>) {
        for triple in triples {
            self.add(triple);
        }
    }

    /// Untyped non-fragment vertices are `rdfs:Resource`
    pub fn finish(self) -> MappedQueryResults {
        let mut results = self.collector.into_results();
        for vertex in &mut results.vertices {
            if !vertex.is_fragment && vertex.types.is_empty() {
                vertex.add_type(RDFS_RESOURCE);
            }
        }
        results
    }
}

/// Map a complete set of triples
pub fn map_triples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> MappedQueryResults {
    let mut mapper = TripleMapper::new();
    mapper.add_all(triples);
    mapper.finish()
}

/// Turn an endpoint-only vertex into a full, untyped one
pub fn promote(mut vertex: Vertex) -> Vertex {
    if vertex.is_fragment {
        vertex.is_fragment = false;
        if vertex.types.is_empty() {
            vertex.add_type(RDFS_RESOURCE);
        }
    }
    vertex
}
