//! GraphSON values to graphlens entities

use super::graphson::{GEdge, GValue, GVertex};
use crate::error::{ConnectorError, ConnectorResult};
use graphlens_core::{
    Bundle, Edge, EdgeConnection, EdgeId, EntityCollector, EntityProperties, EntityValue,
    MappedQueryResults, Scalar, Vertex, VertexId,
};
use graphlens_query::literal::split_types;
use std::collections::BTreeMap;

pub fn to_entity_value(value: &GValue) -> Option<EntityValue> {
    match value {
        GValue::Null => None,
        GValue::Bool(b) => Some(EntityValue::Boolean(*b)),
        GValue::Int(n) => Some(EntityValue::Number(*n as f64)),
        GValue::Double(d) => Some(EntityValue::Number(*d)),
        GValue::String(s) => Some(EntityValue::String(s.clone())),
        GValue::Date(d) => Some(EntityValue::Date(Some(*d))),
        GValue::Property { value, .. } => to_entity_value(value),
        other => Some(EntityValue::String(other.to_string())),
    }
}

fn attributes(properties: &BTreeMap<String, GValue>) -> EntityProperties {
    properties
        .iter()
        .filter_map(|(name, value)| to_entity_value(value).map(|v| (name.clone(), v)))
        .collect()
}

/// Labels are split on `::` into the vertex's type list
pub fn map_vertex(vertex: &GVertex) -> Vertex {
    let types = split_types(&vertex.label).into_iter().map(str::to_string).collect();
    let mut mapped = Vertex::with_types(VertexId::from(vertex.id.clone()), types);
    mapped.attributes = attributes(&vertex.properties);
    mapped
}

/// `outV` is the source, `inV` the target
pub fn map_edge(edge: &GEdge) -> Edge {
    let mut mapped = Edge::new(
        EdgeId::from(edge.id.clone()),
        edge.label.clone(),
        VertexId::from(edge.out_v.clone()),
        VertexId::from(edge.in_v.clone()),
    );
    mapped.attributes = attributes(&edge.properties);
    mapped
}

pub fn expect_vertex(value: &GValue) -> ConnectorResult<Vertex> {
    match value {
        GValue::Vertex(vertex) => Ok(map_vertex(vertex)),
        other => Err(ConnectorError::validation(format!("expected a vertex, got {other}"))),
    }
}

pub fn expect_edge(value: &GValue) -> ConnectorResult<Edge> {
    match value {
        GValue::Edge(edge) => Ok(map_edge(edge)),
        other => Err(ConnectorError::validation(format!("expected an edge, got {other}"))),
    }
}

pub fn vertices(items: &[GValue]) -> ConnectorResult<Vec<Vertex>> {
    let mut collector = EntityCollector::new();
    for item in items {
        collector.add_vertex(expect_vertex(item)?);
    }
    Ok(collector.into_results().vertices)
}

pub fn edges(items: &[GValue]) -> ConnectorResult<Vec<Edge>> {
    let mut collector = EntityCollector::new();
    for item in items {
        collector.add_edge(expect_edge(item)?);
    }
    Ok(collector.into_results().edges)
}

/// Rows of `project("vertex","edges")`
pub fn neighbors(items: &[GValue]) -> ConnectorResult<(Vec<Vertex>, Vec<Edge>)> {
    let mut collector = EntityCollector::new();
    for item in items {
        let vertex = item
            .get("vertex")
            .ok_or_else(|| ConnectorError::validation("neighbor row is missing 'vertex'"))?;
        collector.add_vertex(expect_vertex(vertex)?);

        match item.get("edges") {
            Some(GValue::List(edges)) => {
                for edge in edges {
                    collector.add_edge(expect_edge(edge)?);
                }
            }
            Some(other) => {
                return Err(ConnectorError::validation(format!(
                    "neighbor edges must be a list, got {other}"
                )))
            }
            None => return Err(ConnectorError::validation("neighbor row is missing 'edges'")),
        }
    }
    let results = collector.into_results();
    Ok((results.vertices, results.edges))
}

/// A `groupCount()` map keyed by label
pub fn group_counts(items: &[GValue]) -> ConnectorResult<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    let Some(first) = items.first() else {
        return Ok(counts);
    };
    let GValue::Map(entries) = first else {
        return Err(ConnectorError::validation(format!("expected a count map, got {first}")));
    };
    for (key, value) in entries {
        let count = count_of(value)?;
        *counts.entry(key.to_string()).or_insert(0) += count;
    }
    Ok(counts)
}

/// The single number produced by `count()`
pub fn single_count(items: &[GValue]) -> ConnectorResult<u64> {
    match items.first() {
        Some(value) => count_of(value),
        None => Ok(0),
    }
}

fn count_of(value: &GValue) -> ConnectorResult<u64> {
    value
        .as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| ConnectorError::validation(format!("expected a count, got {value}")))
}

/// `groupCount()` keyed by `{source, target}` label pairs
pub fn edge_connections(edge_type: &str, items: &[GValue]) -> ConnectorResult<Vec<EdgeConnection>> {
    let Some(first) = items.first() else {
        return Ok(Vec::new());
    };
    let GValue::Map(entries) = first else {
        return Err(ConnectorError::validation(format!(
            "expected a connection map, got {first}"
        )));
    };
    entries
        .iter()
        .map(|(key, value)| -> ConnectorResult<EdgeConnection> {
            let endpoint = |name: &str| {
                key.get(name)
                    .map(ToString::to_string)
                    .ok_or_else(|| ConnectorError::validation(format!("connection key is missing '{name}'")))
            };
            Ok(EdgeConnection {
                source_vertex_type: endpoint("source")?,
                edge_type: edge_type.to_string(),
                target_vertex_type: endpoint("target")?,
                count: Some(count_of(value)?),
            })
        })
        .collect()
}

/// Walk any result shape
///
/// Vertices and edges found anywhere are extracted, primitives become
/// scalars and maps of primitives become bundles.
pub fn raw(items: &[GValue]) -> MappedQueryResults {
    let mut collector = EntityCollector::new();
    for item in items {
        walk(item, None, &mut collector);
    }
    collector.into_results()
}

fn walk(value: &GValue, name: Option<String>, collector: &mut EntityCollector) {
    match value {
        GValue::Vertex(vertex) => collector.add_vertex(map_vertex(vertex)),
        GValue::Edge(edge) => collector.add_edge(map_edge(edge)),
        GValue::List(items) => {
            for item in items {
                walk(item, name.clone(), collector);
            }
        }
        GValue::Property { key, value } => walk(value, Some(key.clone()), collector),
        GValue::Map(entries) if !entries.is_empty() && entries.iter().all(|(_, v)| v.is_primitive()) => {
            let values = entries
                .iter()
                .filter_map(|(k, v)| to_entity_value(v).map(|v| Scalar::named(k.to_string(), v)))
                .collect();
            collector.add_bundle(Bundle { name, values });
        }
        GValue::Map(entries) => {
            for (key, value) in entries {
                walk(value, Some(key.to_string()), collector);
            }
        }
        primitive => {
            if let Some(value) = to_entity_value(primitive) {
                collector.add_scalar(Scalar::new(name, value));
            }
        }
    }
}
