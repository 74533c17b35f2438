//! Schema assembly shared by the facades

use graphlens_core::{
    AttributeConfig, AttributeDataType, EdgeConnection, EdgeTypeConfig, EntityProperties,
    SchemaResponse, VertexTypeConfig,
};
use std::collections::BTreeMap;

/// Infers attribute data types from sampled entities
///
/// The first typed sighting of an attribute decides its type.
#[derive(Debug, Default)]
pub(crate) struct AttributeSampler {
    seen: BTreeMap<String, AttributeDataType>,
}

impl AttributeSampler {
    pub fn observe(&mut self, attributes: &EntityProperties) {
        for (name, value) in attributes {
            self.seen
                .entry(name.clone())
                .or_insert_with(|| value.data_type());
        }
    }

    pub fn observe_typed(&mut self, name: impl Into<String>, data_type: AttributeDataType) {
        self.seen.entry(name.into()).or_insert(data_type);
    }

    pub fn into_attributes(self) -> Vec<AttributeConfig> {
        self.seen
            .into_iter()
            .map(|(name, data_type)| AttributeConfig { name, data_type })
            .collect()
    }
}

pub(crate) fn vertex_type(
    type_name: impl Into<String>,
    total: u64,
    attributes: Vec<AttributeConfig>,
) -> VertexTypeConfig {
    VertexTypeConfig {
        type_name: type_name.into(),
        display_label: None,
        total,
        attributes,
    }
}

pub(crate) fn edge_type(
    type_name: impl Into<String>,
    total: u64,
    attributes: Vec<AttributeConfig>,
) -> EdgeTypeConfig {
    EdgeTypeConfig {
        type_name: type_name.into(),
        display_label: None,
        total,
        attributes,
    }
}

/// Totals are the sums of the per-type counts
pub(crate) fn assemble(
    vertices: Vec<VertexTypeConfig>,
    edges: Vec<EdgeTypeConfig>,
    edge_connections: Option<Vec<EdgeConnection>>,
) -> SchemaResponse {
    SchemaResponse {
        total_vertices: vertices.iter().map(|v| v.total).sum(),
        vertices,
        total_edges: edges.iter().map(|e| e.total).sum(),
        edges,
        edge_connections: edge_connections.map(|mut connections| {
            connections.sort();
            connections
        }),
    }
}
