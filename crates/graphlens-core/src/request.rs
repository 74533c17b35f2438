//! Request and response types of the connector operations
//!
//! All types use camelCase on the wire so they can be handed to a UI layer
//! unchanged.

use crate::criterion::{AttributeDataType, Criterion};
use crate::id::{EdgeId, VertexId};
use crate::model::{Edge, MappedQueryResults, Scalar, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Pseudo attribute that makes keyword search match the vertex id
pub const ID_SEARCH_ATTRIBUTE: &str = "~id";

/// One-hop neighbor expansion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeighborsRequest {
    pub vertex_id: Option<VertexId>,
    /// `Some(vec![])` selects nothing and short-circuits
    pub filter_by_vertex_types: Option<Vec<String>>,
    pub edge_types: Option<Vec<String>>,
    pub filter_criteria: Vec<Criterion>,
    /// Zero means unlimited
    pub limit: usize,
    pub offset: usize,
    pub excluded_vertices: BTreeSet<VertexId>,
}

impl NeighborsRequest {
    pub fn new(vertex_id: impl Into<VertexId>) -> Self {
        Self {
            vertex_id: Some(vertex_id.into()),
            ..Self::default()
        }
    }

    pub fn with_vertex_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_by_vertex_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_edge_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.filter_criteria.push(criterion);
        self
    }

    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn excluding(mut self, id: impl Into<VertexId>) -> Self {
        self.excluded_vertices.insert(id.into());
        self
    }

    /// True when the request cannot select anything
    pub fn is_trivially_empty(&self) -> bool {
        self.vertex_id.is_none()
            || matches!(&self.filter_by_vertex_types, Some(types) if types.is_empty())
            || matches!(&self.edge_types, Some(types) if types.is_empty())
    }

    /// Requested vertex types, or an empty slice when unfiltered
    pub fn vertex_types(&self) -> &[String] {
        self.filter_by_vertex_types.as_deref().unwrap_or_default()
    }

    pub fn edge_type_filter(&self) -> &[String] {
        self.edge_types.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborsResponse {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

/// Neighbor totals per type around one vertex
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeighborsCountRequest {
    pub vertex_id: Option<VertexId>,
    /// Cap on the neighbors sampled for counting
    pub limit: Option<usize>,
}

impl NeighborsCountRequest {
    pub fn new(vertex_id: impl Into<VertexId>) -> Self {
        Self {
            vertex_id: Some(vertex_id.into()),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborsCountResponse {
    pub total_count: u64,
    pub counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordSearchRequest {
    /// Absent means "list vertices of the given types"
    pub search_term: Option<String>,
    pub vertex_types: Vec<String>,
    /// Attribute names to search; may contain [`ID_SEARCH_ATTRIBUTE`]
    pub search_by_attributes: Vec<String>,
    pub exact_match: bool,
    pub limit: usize,
    pub offset: usize,
}

impl KeywordSearchRequest {
    pub fn term(&self) -> Option<&str> {
        self.search_term.as_deref().filter(|t| !t.is_empty())
    }

    pub fn searches_id(&self) -> bool {
        self.search_by_attributes
            .iter()
            .any(|a| a == ID_SEARCH_ATTRIBUTE)
    }

    /// Searched attribute names excluding the id token
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.search_by_attributes
            .iter()
            .map(String::as_str)
            .filter(|a| *a != ID_SEARCH_ATTRIBUTE)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSearchResponse {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub scalars: Vec<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexDetailsRequest {
    pub vertex_ids: Vec<VertexId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VertexDetailsResponse {
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDetailsRequest {
    pub edge_ids: Vec<EdgeId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeDetailsResponse {
    pub edges: Vec<Edge>,
}

/// Total instances of one, possibly compound (`A::B`), vertex type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountsByTypeRequest {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountsByTypeResponse {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawQueryRequest {
    pub query: String,
}

pub type RawQueryResponse = MappedQueryResults;

/// Edge connection discovery for the given edge types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeConnectionsRequest {
    pub edge_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeConfig {
    pub name: String,
    pub data_type: AttributeDataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexTypeConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    pub total: u64,
    pub attributes: Vec<AttributeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeTypeConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    pub total: u64,
    pub attributes: Vec<AttributeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeConnection {
    pub source_vertex_type: String,
    pub edge_type: String,
    pub target_vertex_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub total_vertices: u64,
    pub vertices: Vec<VertexTypeConfig>,
    pub total_edges: u64,
    pub edges: Vec<EdgeTypeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_connections: Option<Vec<EdgeConnection>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_type_filter_is_trivially_empty() {
        let request = NeighborsRequest::new("v1").with_vertex_types(Vec::<String>::new());
        assert!(request.is_trivially_empty());
        assert!(!NeighborsRequest::new("v1").is_trivially_empty());
        assert!(NeighborsRequest::default().is_trivially_empty());
    }

    #[test]
    fn test_neighbors_request_from_camel_case() {
        let request: NeighborsRequest = serde_json::from_str(
            r#"{"vertexId": 7, "filterByVertexTypes": ["airport"], "limit": 10, "excludedVertices": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(request.vertex_id, Some(VertexId::from(7i64)));
        assert_eq!(request.vertex_types(), ["airport".to_string()]);
        assert_eq!(request.limit, 10);
        assert!(request.excluded_vertices.contains(&VertexId::from("a")));
    }

    #[test]
    fn test_keyword_search_id_token() {
        let request = KeywordSearchRequest {
            search_term: Some("sea".into()),
            search_by_attributes: vec!["~id".into(), "code".into()],
            ..Default::default()
        };
        assert!(request.searches_id());
        assert_eq!(request.attribute_names().collect::<Vec<_>>(), vec!["code"]);
    }

    #[test]
    fn test_empty_search_term_is_absent() {
        let request = KeywordSearchRequest {
            search_term: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(request.term(), None);
    }
}
