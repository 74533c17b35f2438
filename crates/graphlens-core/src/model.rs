//! Entity model produced by every result mapper
//!
//! Vertices and edges are created fresh per response; the caller owns them
//! after the connector call returns. [`EntityCollector`] is the single place
//! where duplicate sightings of the same entity are merged.

use crate::criterion::AttributeDataType;
use crate::id::{EdgeId, VertexId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A primitive attribute or scalar value
///
/// Coercion is best-effort: an unparseable number is kept as `NaN` and an
/// unparseable date as `Date(None)` instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    String(String),
    Number(f64),
    Boolean(bool),
    /// `None` is an invalid date literal
    Date(Option<DateTime<Utc>>),
}

impl EntityValue {
    /// Coerce a plain JSON value; `null` has no entity value
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => Some(Self::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Some(Self::String(s.clone())),
            other => Some(Self::String(other.to_string())),
        }
    }

    /// Parse a numeric literal, keeping `NaN` on failure
    pub fn number_from_str(text: &str) -> Self {
        Self::Number(text.trim().parse::<f64>().unwrap_or(f64::NAN))
    }

    /// Parse a date literal, keeping an invalid date on failure
    pub fn date_from_str(text: &str) -> Self {
        Self::Date(parse_date(text))
    }

    /// Numeric view used by range comparisons
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            Self::Boolean(_) => None,
            Self::Date(d) => d.map(|d| d.timestamp_millis() as f64),
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => *d,
            Self::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// The attribute data type this value reports in schema discovery
    pub fn data_type(&self) -> AttributeDataType {
        match self {
            Self::String(_) => AttributeDataType::String,
            Self::Number(_) => AttributeDataType::Number,
            Self::Boolean(_) => AttributeDataType::Boolean,
            Self::Date(_) => AttributeDataType::Date,
        }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(Some(d)) => f.write_str(&d.to_rfc3339()),
            Self::Date(None) => f.write_str("Invalid Date"),
        }
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for EntityValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for EntityValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for EntityValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Parse RFC 3339, naive date-times (as UTC) and plain dates (midnight UTC)
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Attribute name to value
pub type EntityProperties = BTreeMap<String, EntityValue>;

/// A graph vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub id: VertexId,
    /// Ordered label set, the first entry is the primary type
    pub types: Vec<String>,
    #[serde(default)]
    pub attributes: EntityProperties,
    /// Only known as an edge endpoint
    #[serde(default)]
    pub is_fragment: bool,
    #[serde(default)]
    pub is_blank_node: bool,
}

impl Vertex {
    pub fn new(id: impl Into<VertexId>, vertex_type: impl Into<String>) -> Self {
        Self::with_types(id, vec![vertex_type.into()])
    }

    pub fn with_types(id: impl Into<VertexId>, types: Vec<String>) -> Self {
        let mut vertex = Self {
            id: id.into(),
            types: Vec::with_capacity(types.len()),
            attributes: EntityProperties::new(),
            is_fragment: false,
            is_blank_node: false,
        };
        for t in types {
            vertex.add_type(t);
        }
        vertex
    }

    /// A partially known vertex referenced by an edge
    pub fn fragment(id: impl Into<VertexId>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            attributes: EntityProperties::new(),
            is_fragment: true,
            is_blank_node: false,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<EntityValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn blank(mut self) -> Self {
        self.is_blank_node = true;
        self
    }

    /// Append a type unless already present
    pub fn add_type(&mut self, vertex_type: impl Into<String>) {
        let vertex_type = vertex_type.into();
        if !vertex_type.is_empty() && !self.types.contains(&vertex_type) {
            self.types.push(vertex_type);
        }
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    pub fn has_type(&self, vertex_type: &str) -> bool {
        self.types.iter().any(|t| t == vertex_type)
    }

    /// Merge another sighting of the same vertex into this one
    ///
    /// Types are unioned in order, attributes are overwritten by `other`.
    pub fn merge(&mut self, other: Vertex) {
        for t in other.types {
            self.add_type(t);
        }
        self.attributes.extend(other.attributes);
        self.is_fragment = self.is_fragment && other.is_fragment;
        self.is_blank_node = self.is_blank_node || other.is_blank_node;
    }
}

/// A graph edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub source_id: VertexId,
    pub target_id: VertexId,
    #[serde(default)]
    pub attributes: EntityProperties,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        edge_type: impl Into<String>,
        source_id: impl Into<VertexId>,
        target_id: impl Into<VertexId>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type: edge_type.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            attributes: EntityProperties::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<EntityValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint at all
    pub fn other_end(&self, id: &VertexId) -> Option<&VertexId> {
        if &self.source_id == id {
            Some(&self.target_id)
        } else if &self.target_id == id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// A single named primitive from an ad-hoc query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub name: Option<String>,
    pub value: EntityValue,
}

impl Scalar {
    pub fn new(name: Option<String>, value: impl Into<EntityValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<EntityValue>) -> Self {
        Self::new(Some(name.into()), value)
    }
}

/// One multi-variable result row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub name: Option<String>,
    pub values: Vec<Scalar>,
}

/// Everything a mapper extracted from one response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MappedQueryResults {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub scalars: Vec<Scalar>,
    pub bundles: Vec<Bundle>,
}

impl MappedQueryResults {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.edges.is_empty()
            && self.scalars.is_empty()
            && self.bundles.is_empty()
    }
}

/// Insertion-ordered entity accumulator that merges repeated sightings
#[derive(Debug, Default)]
pub struct EntityCollector {
    vertices: Vec<Vertex>,
    vertex_index: HashMap<VertexId, usize>,
    edges: Vec<Edge>,
    edge_index: HashMap<EdgeId, usize>,
    scalars: Vec<Scalar>,
    bundles: Vec<Bundle>,
}

impl EntityCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: Vertex) {
        match self.vertex_index.get(&vertex.id) {
            Some(&i) => self.vertices[i].merge(vertex),
            None => {
                self.vertex_index.insert(vertex.id.clone(), self.vertices.len());
                self.vertices.push(vertex);
            }
        }
    }

    /// Record an edge endpoint that may never be seen in full
    pub fn add_fragment(&mut self, id: VertexId) {
        if !self.vertex_index.contains_key(&id) {
            self.add_vertex(Vertex::fragment(id));
        }
    }

    pub fn add_edge(&mut self, edge: Edge) {
        match self.edge_index.get(&edge.id) {
            Some(&i) => self.edges[i].attributes.extend(edge.attributes),
            None => {
                self.edge_index.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub fn add_scalar(&mut self, scalar: Scalar) {
        self.scalars.push(scalar);
    }

    pub fn add_bundle(&mut self, bundle: Bundle) {
        self.bundles.push(bundle);
    }

    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.vertex_index.get(id).map(|&i| &self.vertices[i])
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn into_results(self) -> MappedQueryResults {
        MappedQueryResults {
            vertices: self.vertices,
            edges: self.edges,
            scalars: self.scalars,
            bundles: self.bundles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_unions_types_and_overwrites_attributes() {
        let mut a = Vertex::new("v1", "airport").with_attribute("code", "SEA");
        let b = Vertex::with_types("v1", vec!["place".into(), "airport".into()])
            .with_attribute("code", "SEA2")
            .with_attribute("runways", 3i64);

        a.merge(b);

        assert_eq!(a.types, vec!["airport", "place"]);
        assert_eq!(a.attributes["code"], EntityValue::from("SEA2"));
        assert_eq!(a.attributes["runways"], EntityValue::Number(3.0));
    }

    #[test]
    fn test_fragment_becomes_full_after_merge() {
        let mut collector = EntityCollector::new();
        collector.add_fragment(VertexId::from("v1"));
        collector.add_vertex(Vertex::new("v1", "airport"));
        collector.add_fragment(VertexId::from("v1"));

        let results = collector.into_results();
        assert_eq!(results.vertices.len(), 1);
        assert!(!results.vertices[0].is_fragment);
        assert_eq!(results.vertices[0].primary_type(), Some("airport"));
    }

    #[test]
    fn test_collector_dedups_edges_keeping_order() {
        let mut collector = EntityCollector::new();
        collector.add_edge(Edge::new("e2", "route", "a", "b"));
        collector.add_edge(Edge::new("e1", "route", "b", "c"));
        collector.add_edge(Edge::new("e2", "route", "a", "b").with_attribute("dist", 10i64));

        let results = collector.into_results();
        let ids: Vec<String> = results.edges.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
        assert_eq!(results.edges[0].attributes["dist"], EntityValue::Number(10.0));
    }

    #[test]
    fn test_best_effort_literals() {
        assert!(matches!(EntityValue::number_from_str("abc"), EntityValue::Number(n) if n.is_nan()));
        assert_eq!(EntityValue::date_from_str("not a date"), EntityValue::Date(None));
        assert_eq!(EntityValue::date_from_str("nope").to_string(), "Invalid Date");
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = parse_date("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(parse_date("2024-03-01"), Some(expected));
        assert_eq!(parse_date("2024-03-01T00:00:00"), Some(expected));
        assert_eq!(parse_date("2024-03-01T01:00:00+01:00"), Some(expected));
    }

    #[test]
    fn test_number_display() {
        assert_eq!(EntityValue::Number(3.0).to_string(), "3");
        assert_eq!(EntityValue::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_vertex_serializes_camel_case() {
        let json = serde_json::to_value(Vertex::fragment("x")).unwrap();
        assert_eq!(json["isFragment"], true);
        assert_eq!(json["isBlankNode"], false);
    }
}
