//! openCypher wire shapes
//!
//! Responses are `{ "results": [row, ...] }` where each row maps the
//! returned column names to values. Nodes and relationships carry their
//! identity in `~`-prefixed fields.

use crate::error::{ConnectorError, ConnectorResult};
use graphlens_core::EntityId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CypherNode {
    #[serde(rename = "~id")]
    pub id: EntityId,
    #[serde(rename = "~labels", default)]
    pub labels: Vec<String>,
    #[serde(rename = "~properties", default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CypherRelationship {
    #[serde(rename = "~id")]
    pub id: EntityId,
    #[serde(rename = "~type")]
    pub rel_type: String,
    #[serde(rename = "~start")]
    pub start: EntityId,
    #[serde(rename = "~end")]
    pub end: EntityId,
    #[serde(rename = "~properties", default)]
    pub properties: Map<String, Value>,
}

/// Entity kinds recognised inside arbitrary result values
#[derive(Debug, Clone, PartialEq)]
pub enum CypherEntity {
    Node(CypherNode),
    Relationship(CypherRelationship),
}

impl CypherEntity {
    /// Classify a value by its `~entityType`, or by its fields when absent
    pub fn detect(value: &Value) -> Option<ConnectorResult<Self>> {
        let object = value.as_object()?;
        if !object.contains_key("~id") {
            return None;
        }
        let kind = object.get("~entityType").and_then(Value::as_str);
        let is_relationship = match kind {
            Some(kind) => kind == "relationship",
            None => object.contains_key("~type"),
        };
        Some(if is_relationship {
            decode(value, "relationship").map(Self::Relationship)
        } else {
            decode(value, "node").map(Self::Node)
        })
    }
}

fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> ConnectorResult<T> {
    T::deserialize(value).map_err(|e| ConnectorError::validation(format!("invalid openCypher {what}: {e}")))
}

/// The rows of a response
pub fn rows(body: &Value) -> ConnectorResult<Vec<Row>> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::validation("expected a 'results' array in openCypher response"))?;

    results
        .iter()
        .map(|row| {
            row.as_object()
                .cloned()
                .ok_or_else(|| ConnectorError::validation(format!("openCypher row is not an object: {row}")))
        })
        .collect()
}

fn column<'a>(row: &'a Row, name: &str) -> ConnectorResult<&'a Value> {
    row.get(name)
        .ok_or_else(|| ConnectorError::validation(format!("openCypher row is missing '{name}'")))
}

pub fn node(row: &Row, name: &str) -> ConnectorResult<CypherNode> {
    decode(column(row, name)?, "node")
}

pub fn relationship(row: &Row, name: &str) -> ConnectorResult<CypherRelationship> {
    decode(column(row, name)?, "relationship")
}

pub fn nodes(row: &Row, name: &str) -> ConnectorResult<Vec<CypherNode>> {
    decode(column(row, name)?, "node list")
}

pub fn relationships(row: &Row, name: &str) -> ConnectorResult<Vec<CypherRelationship>> {
    decode(column(row, name)?, "relationship list")
}

pub fn count(row: &Row, name: &str) -> ConnectorResult<u64> {
    let value = column(row, name)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
        .ok_or_else(|| ConnectorError::validation(format!("'{name}' is not a count: {value}")))
}

/// A label set: `labels(v)` returns a list, `type(e)` a single string
pub fn labels(row: &Row, name: &str) -> ConnectorResult<Vec<String>> {
    match column(row, name)? {
        Value::String(s) => Ok(vec![s.clone()]),
        other => decode(other, "label list"),
    }
}
