//! Blank-node registry
//!
//! Blank nodes have no stable identifier outside the response they were
//! found in, so each one is remembered together with the locator query
//! (`sub_query_template`) that can find it again.
//!
//! ```text
//! discover ──> Discovered ──resolve──> Resolving ──ok──> Resolved
//!                  ^                       │
//!                  └──── error / cancel ───┘
//! ```
//!
//! Resolution runs the one-hop query once per entry; concurrent first
//! requests wait on the same cell. Later neighbor and count requests are
//! answered from the resolved neighbor set, filtered client-side.
//!
//! Endpoints relabel blank nodes in every response, so each entry also
//! keeps what was seen of the node (its draft vertex and the edges joining
//! it to IRI-identified vertices). The one-hop response is matched against
//! those facts to pick the right node among the ones a locator finds.

use crate::connector::count_by_type;
use crate::error::{ConnectorError, ConnectorResult};
use graphlens_config::BlankNodeConfig;
use graphlens_core::{
    Edge, EdgeId, IdentityError, NeighborsCountRequest, NeighborsCountResponse, NeighborsRequest,
    NeighborsResponse, Vertex, VertexId,
};
use graphlens_query::literal::{is_iri, split_all_types};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Snapshot of one registry entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankNodeItem {
    pub id: VertexId,
    pub sub_query_template: String,
    pub vertex: Vertex,
    /// Present once resolved
    pub neighbor_counts: Option<NeighborsCountResponse>,
    pub neighbors: Option<NeighborsResponse>,
}

/// Materialised one-hop neighborhood of a blank node
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNeighborhood {
    /// The blank node itself as seen by the one-hop query
    pub vertex: Option<Vertex>,
    pub neighbors: Vec<Vertex>,
    /// Edges between the blank node and its neighbors
    pub edges: Vec<Edge>,
}

impl ResolvedNeighborhood {
    pub fn counts(&self) -> NeighborsCountResponse {
        count_by_type(&self.neighbors)
    }

    /// Counts over at most `request.limit` neighbors
    pub fn counts_for(&self, request: &NeighborsCountRequest) -> NeighborsCountResponse {
        let limit = request.limit.unwrap_or(usize::MAX);
        count_by_type(self.neighbors.iter().take(limit))
    }

    /// Apply type, edge, criteria and exclusion filters, then the page
    pub fn filter(&self, request: &NeighborsRequest) -> NeighborsResponse {
        let vertex_types = split_all_types(request.vertex_types());
        let edge_types = split_all_types(request.edge_type_filter());

        let edges: Vec<&Edge> = self
            .edges
            .iter()
            .filter(|e| edge_types.is_empty() || edge_types.contains(&e.edge_type.as_str()))
            .collect();

        let connected = |vertex: &Vertex| {
            edge_types.is_empty()
                || edges
                    .iter()
                    .any(|e| e.source_id == vertex.id || e.target_id == vertex.id)
        };

        let selected: Vec<Vertex> = self
            .neighbors
            .iter()
            .filter(|v| !request.excluded_vertices.contains(&v.id))
            .filter(|v| vertex_types.is_empty() || vertex_types.iter().any(|t| v.has_type(t)))
            .filter(|v| {
                request
                    .filter_criteria
                    .iter()
                    .all(|c| c.matches(v.attributes.get(&c.name)))
            })
            .filter(|v| connected(*v))
            .skip(if request.limit > 0 { request.offset } else { 0 })
            .take(if request.limit > 0 { request.limit } else { usize::MAX })
            .cloned()
            .collect();

        let selected_ids: BTreeSet<&VertexId> = selected.iter().map(|v| &v.id).collect();
        let edges = edges
            .into_iter()
            .filter(|e| selected_ids.contains(&e.source_id) || selected_ids.contains(&e.target_id))
            .cloned()
            .collect();

        NeighborsResponse {
            vertices: selected,
            edges,
        }
    }
}

/// Everything known about a blank node before it is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    /// Query projecting `?bNode` that finds the node again
    pub template: String,
    /// Draft built from every sighting so far
    pub vertex: Vertex,
    /// Edges between the node and IRI-identified vertices
    pub known_edges: BTreeSet<EdgeId>,
}

#[derive(Debug)]
struct Entry {
    template: String,
    vertex: Vertex,
    known_edges: BTreeSet<EdgeId>,
    resolved: Arc<OnceCell<Arc<ResolvedNeighborhood>>>,
    discovered_at: Instant,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<VertexId, Entry>,
    next_sequence: u64,
}

/// Per-connector blank-node state
#[derive(Debug, Default)]
pub struct BlankNodeRegistry {
    entries: Mutex<Entries>,
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

impl BlankNodeRegistry {
    /// Unbounded unless the config sets a cap or a time to live
    pub fn new(config: &BlankNodeConfig) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: config.max_entries.filter(|n| *n > 0),
            ttl: config.ttl(),
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .map(|ttl| entry.discovered_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    fn purge_expired(&self, entries: &mut Entries) {
        if self.ttl.is_none() {
            return;
        }
        let before = entries.by_id.len();
        entries.by_id.retain(|_, entry| !self.is_expired(entry));
        let purged = before - entries.by_id.len();
        if purged > 0 {
            trace!(purged, "expired blank nodes dropped");
        }
    }

    /// Record a sighting of a blank node together with the edges of the
    /// response it was found in
    ///
    /// The first sighting's locator is kept; later sightings only merge
    /// into the vertex draft and the known edges.
    pub fn discover(&self, vertex: Vertex, template: &str, edges: &[Edge]) {
        let anchored = edges.iter().filter(|edge| {
            edge.other_end(&vertex.id)
                .and_then(VertexId::as_str)
                .map(is_iri)
                .unwrap_or(false)
        });
        let known_edges: BTreeSet<EdgeId> = anchored.map(|edge| edge.id.clone()).collect();

        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);

        if let Some(entry) = entries.by_id.get_mut(&vertex.id) {
            entry.vertex.merge(vertex);
            entry.known_edges.extend(known_edges);
            return;
        }

        let sequence = entries.next_sequence;
        entries.next_sequence += 1;
        debug!(id = %vertex.id, "blank node discovered");
        entries.by_id.insert(
            vertex.id.clone(),
            Entry {
                template: template.to_string(),
                vertex,
                known_edges,
                resolved: Arc::new(OnceCell::new()),
                discovered_at: Instant::now(),
                sequence,
            },
        );

        if let Some(max) = self.max_entries {
            while entries.by_id.len() > max {
                let oldest = entries
                    .by_id
                    .iter()
                    .min_by_key(|(_, entry)| entry.sequence)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        trace!(%id, "blank node evicted");
                        entries.by_id.remove(&id);
                    }
                    None => break,
                }
            }
        }
    }

    pub fn contains(&self, id: &VertexId) -> bool {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);
        entries.by_id.contains_key(id)
    }

    /// The locator query of a known blank node
    pub fn template(&self, id: &VertexId) -> Option<String> {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);
        entries.by_id.get(id).map(|e| e.template.clone())
    }

    pub fn vertex(&self, id: &VertexId) -> Option<Vertex> {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);
        entries.by_id.get(id).map(|e| e.vertex.clone())
    }

    /// Resolve the neighborhood once, coalescing concurrent callers
    ///
    /// `load` receives the entry's [`Locator`]. Nothing is stored when it
    /// fails or is cancelled, so a later call retries.
    pub async fn resolve<F, Fut>(&self, id: &VertexId, load: F) -> ConnectorResult<Arc<ResolvedNeighborhood>>
    where
        F: FnOnce(Locator) -> Fut,
        Fut: Future<Output = ConnectorResult<ResolvedNeighborhood>>,
    {
        let (cell, locator) = {
            let mut entries = self.entries.lock();
            self.purge_expired(&mut entries);
            let entry = entries.by_id.get(id).ok_or_else(|| unknown(id))?;
            let locator = Locator {
                template: entry.template.clone(),
                vertex: entry.vertex.clone(),
                known_edges: entry.known_edges.clone(),
            };
            (entry.resolved.clone(), locator)
        };

        let resolved = cell
            .get_or_try_init(|| async move { load(locator).await.map(Arc::new) })
            .await?
            .clone();

        if let Some(vertex) = &resolved.vertex {
            if let Some(entry) = self.entries.lock().by_id.get_mut(id) {
                entry.vertex.merge(vertex.clone());
            }
        }
        Ok(resolved)
    }

    pub fn snapshot(&self, id: &VertexId) -> Option<BlankNodeItem> {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);
        let entry = entries.by_id.get(id)?;
        let resolved = entry.resolved.get();
        Some(BlankNodeItem {
            id: id.clone(),
            sub_query_template: entry.template.clone(),
            vertex: entry.vertex.clone(),
            neighbor_counts: resolved.map(|r| r.counts()),
            neighbors: resolved.map(|r| NeighborsResponse {
                vertices: r.neighbors.clone(),
                edges: r.edges.clone(),
            }),
        })
    }

    /// Resolved edges touching any known blank node
    pub fn resolved_edges(&self) -> Vec<Edge> {
        let entries = self.entries.lock();
        entries
            .by_id
            .values()
            .filter_map(|entry| entry.resolved.get())
            .flat_map(|resolved| resolved.edges.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries);
        entries.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.by_id.clear();
    }
}

fn unknown(id: &VertexId) -> ConnectorError {
    IdentityError::new(id.to_string(), "unknown blank node").into()
}
