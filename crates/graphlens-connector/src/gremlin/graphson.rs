//! GraphSON decoding
//!
//! Typed values (`{"@type": "g:Vertex", "@value": {...}}`) are decoded into a
//! [`GValue`] tree at the boundary. Untyped GraphSON 1 vertex and edge shapes
//! are accepted as well, as are unknown type tags, whose payload is decoded
//! as if it were untyped.

use crate::error::{ConnectorError, ConnectorResult};
use chrono::{DateTime, Utc};
use graphlens_core::EntityId;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<GValue>),
    /// Entries in wire order; keys may be any value
    Map(Vec<(GValue, GValue)>),
    Vertex(GVertex),
    Edge(GEdge),
    Property { key: String, value: Box<GValue> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GVertex {
    pub id: EntityId,
    pub label: String,
    pub properties: BTreeMap<String, GValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GEdge {
    pub id: EntityId,
    pub label: String,
    pub out_v: EntityId,
    pub in_v: EntityId,
    pub properties: BTreeMap<String, GValue>,
}

impl GValue {
    pub fn decode(value: &Value) -> ConnectorResult<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => Ok(n
                .as_i64()
                .map(Self::Int)
                .unwrap_or_else(|| Self::Double(n.as_f64().unwrap_or(f64::NAN)))),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(items) => items.iter().map(Self::decode).collect::<Result<_, _>>().map(Self::List),
            Value::Object(object) => match (object.get("@type"), object.get("@value")) {
                (Some(Value::String(tag)), Some(payload)) => Self::decode_typed(tag, payload),
                _ => Self::decode_untyped(object),
            },
        }
    }

    fn decode_typed(tag: &str, payload: &Value) -> ConnectorResult<Self> {
        match tag {
            "g:List" | "g:Set" => match payload {
                Value::Array(_) => Self::decode(payload),
                _ => Err(invalid(tag, "expected an array")),
            },
            "g:Map" => {
                let items = payload.as_array().ok_or_else(|| invalid(tag, "expected an array"))?;
                if items.len() % 2 != 0 {
                    return Err(invalid(tag, "odd number of key/value items"));
                }
                items
                    .chunks(2)
                    .map(|pair| -> ConnectorResult<(GValue, GValue)> {
                        Ok((Self::decode(&pair[0])?, Self::decode(&pair[1])?))
                    })
                    .collect::<ConnectorResult<_>>()
                    .map(Self::Map)
            }
            "g:Int32" | "g:Int64" => payload
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| invalid(tag, "expected an integer")),
            "g:Double" | "g:Float" => match payload {
                Value::Number(n) => Ok(Self::Double(n.as_f64().unwrap_or(f64::NAN))),
                Value::String(s) => Ok(Self::Double(s.parse().unwrap_or(f64::NAN))),
                _ => Err(invalid(tag, "expected a number")),
            },
            "g:Date" | "g:Timestamp" => payload
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(Self::Date)
                .ok_or_else(|| invalid(tag, "expected epoch milliseconds")),
            "g:UUID" | "g:T" => payload
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(|| invalid(tag, "expected a string")),
            "g:Vertex" => GVertex::decode(object_of(tag, payload)?).map(Self::Vertex),
            "g:Edge" => GEdge::decode(object_of(tag, payload)?).map(Self::Edge),
            "g:VertexProperty" => {
                let object = object_of(tag, payload)?;
                Ok(Self::Property {
                    key: text(object, "label").unwrap_or_default(),
                    value: Box::new(Self::decode(object.get("value").unwrap_or(&Value::Null))?),
                })
            }
            "g:Property" => {
                let object = object_of(tag, payload)?;
                Ok(Self::Property {
                    key: text(object, "key").ok_or_else(|| invalid(tag, "missing key"))?,
                    value: Box::new(Self::decode(object.get("value").unwrap_or(&Value::Null))?),
                })
            }
            "g:Path" => {
                let object = object_of(tag, payload)?;
                match object.get("objects") {
                    Some(objects) => Self::decode(objects),
                    None => Err(invalid(tag, "missing objects")),
                }
            }
            _ => Self::decode(payload),
        }
    }

    fn decode_untyped(object: &Map<String, Value>) -> ConnectorResult<Self> {
        match object.get("type").and_then(Value::as_str) {
            Some("vertex") if object.contains_key("id") => GVertex::decode(object).map(Self::Vertex),
            Some("edge") if object.contains_key("id") => GEdge::decode(object).map(Self::Edge),
            _ => object
                .iter()
                .map(|(k, v)| -> ConnectorResult<(GValue, GValue)> {
                    Ok((Self::String(k.clone()), Self::decode(v)?))
                })
                .collect::<ConnectorResult<_>>()
                .map(Self::Map),
        }
    }

    /// Map lookup by string key
    pub fn get(&self, key: &str) -> Option<&GValue> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Self::String(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Double(d) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Double(_) | Self::String(_) | Self::Date(_)
        )
    }

    /// Identifier view of an `id`, `outV` or `inV` value
    fn to_entity_id(&self) -> EntityId {
        match self {
            Self::Int(n) => EntityId::Number(*n),
            Self::String(s) => EntityId::String(s.clone()),
            other => EntityId::String(other.to_string()),
        }
    }
}

impl fmt::Display for GValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Map(entries) => {
                let entries: Vec<String> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Self::Vertex(v) => write!(f, "v[{}]", v.id),
            Self::Edge(e) => write!(f, "e[{}]", e.id),
            Self::Property { key, value } => write!(f, "p[{key}->{value}]"),
        }
    }
}

impl GVertex {
    fn decode(object: &Map<String, Value>) -> ConnectorResult<Self> {
        Ok(Self {
            id: required_id(object, "id", "vertex")?,
            label: text(object, "label").unwrap_or_else(|| "vertex".to_string()),
            properties: properties(object)?,
        })
    }
}

impl GEdge {
    fn decode(object: &Map<String, Value>) -> ConnectorResult<Self> {
        Ok(Self {
            id: required_id(object, "id", "edge")?,
            label: text(object, "label").unwrap_or_else(|| "edge".to_string()),
            out_v: required_id(object, "outV", "edge")?,
            in_v: required_id(object, "inV", "edge")?,
            properties: properties(object)?,
        })
    }
}

/// Property map of a vertex or edge
///
/// Vertex properties arrive as lists of `g:VertexProperty`; the first
/// value of a multi-property wins. Edge properties are `g:Property` values.
fn properties(object: &Map<String, Value>) -> ConnectorResult<BTreeMap<String, GValue>> {
    let Some(raw) = object.get("properties") else {
        return Ok(BTreeMap::new());
    };
    let raw = raw
        .as_object()
        .ok_or_else(|| ConnectorError::validation("GraphSON properties must be an object"))?;

    let mut out = BTreeMap::new();
    for (name, value) in raw {
        let value = match value {
            Value::Array(items) => match items.first() {
                Some(first) => property_value(first)?,
                None => continue,
            },
            other => property_value(other)?,
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

fn property_value(value: &Value) -> ConnectorResult<GValue> {
    match value {
        Value::Object(object) if !object.contains_key("@type") && object.contains_key("value") => {
            GValue::decode(&object["value"])
        }
        other => match GValue::decode(other)? {
            GValue::Property { value, .. } => Ok(*value),
            decoded => Ok(decoded),
        },
    }
}

fn required_id(object: &Map<String, Value>, key: &str, kind: &str) -> ConnectorResult<EntityId> {
    let value = object
        .get(key)
        .ok_or_else(|| ConnectorError::validation(format!("GraphSON {kind} is missing '{key}'")))?;
    Ok(GValue::decode(value)?.to_entity_id())
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_of<'a>(tag: &str, payload: &'a Value) -> ConnectorResult<&'a Map<String, Value>> {
    payload.as_object().ok_or_else(|| invalid(tag, "expected an object"))
}

fn invalid(tag: &str, reason: &str) -> ConnectorError {
    ConnectorError::validation(format!("invalid {tag}: {reason}"))
}

/// The result list of a Gremlin response
///
/// Accepts the server envelope `{ result: { data } }` and the plain
/// `{ results: [...] }` shape.
pub fn decode_results(body: &Value) -> ConnectorResult<Vec<GValue>> {
    let data = body
        .get("result")
        .and_then(|result| result.get("data"))
        .or_else(|| body.get("results"))
        .ok_or_else(|| ConnectorError::validation("expected 'result.data' or 'results' in Gremlin response"))?;

    match GValue::decode(data)? {
        GValue::List(items) => Ok(items),
        GValue::Null => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typed(tag: &str, value: Value) -> Value {
        json!({ "@type": tag, "@value": value })
    }

    fn airport_vertex() -> Value {
        typed(
            "g:Vertex",
            json!({
                "id": "1",
                "label": "airport",
                "properties": {
                    "code": [typed("g:VertexProperty", json!({ "id": typed("g:Int64", json!(10)), "value": "ATL", "label": "code" }))],
                    "runways": [typed("g:VertexProperty", json!({ "id": typed("g:Int64", json!(11)), "value": typed("g:Int32", json!(5)), "label": "runways" }))]
                }
            }),
        )
    }

    #[test]
    fn test_decode_vertex_properties() {
        let GValue::Vertex(vertex) = GValue::decode(&airport_vertex()).unwrap() else {
            panic!("expected a vertex");
        };
        assert_eq!(vertex.id, EntityId::from("1"));
        assert_eq!(vertex.label, "airport");
        assert_eq!(vertex.properties["code"], GValue::String("ATL".into()));
        assert_eq!(vertex.properties["runways"], GValue::Int(5));
    }

    #[test]
    fn test_decode_edge_with_numeric_endpoints() {
        let edge = typed(
            "g:Edge",
            json!({
                "id": typed("g:Int64", json!(5001)),
                "label": "route",
                "outV": typed("g:Int64", json!(1)),
                "inV": typed("g:Int64", json!(2)),
                "properties": {
                    "dist": typed("g:Property", json!({ "key": "dist", "value": typed("g:Double", json!(809.5)) }))
                }
            }),
        );
        let GValue::Edge(edge) = GValue::decode(&edge).unwrap() else {
            panic!("expected an edge");
        };
        assert_eq!(edge.id, EntityId::Number(5001));
        assert_eq!(edge.out_v, EntityId::Number(1));
        assert_eq!(edge.in_v, EntityId::Number(2));
        assert_eq!(edge.properties["dist"], GValue::Double(809.5));
    }

    #[test]
    fn test_map_keeps_non_string_keys() {
        let map = typed(
            "g:Map",
            json!([typed("g:T", json!("label")), "airport", typed("g:Int32", json!(1)), "one"]),
        );
        let GValue::Map(entries) = GValue::decode(&map).unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(entries[0], (GValue::String("label".into()), GValue::String("airport".into())));
        assert_eq!(entries[1].0, GValue::Int(1));
    }

    #[test]
    fn test_odd_map_is_rejected() {
        let err = GValue::decode(&typed("g:Map", json!(["a"]))).unwrap_err();
        assert!(matches!(err, ConnectorError::Validation(_)));
    }

    #[test]
    fn test_date_and_path() {
        assert_eq!(
            GValue::decode(&typed("g:Date", json!(0))).unwrap(),
            GValue::Date(DateTime::<Utc>::from_timestamp_millis(0).unwrap())
        );
        let path = typed(
            "g:Path",
            json!({ "labels": typed("g:List", json!([])), "objects": typed("g:List", json!([airport_vertex()])) }),
        );
        assert!(matches!(GValue::decode(&path).unwrap(), GValue::List(items) if items.len() == 1));
    }

    #[test]
    fn test_untyped_graphson1_vertex() {
        let vertex = json!({
            "id": 1,
            "label": "person",
            "type": "vertex",
            "properties": { "name": [{ "id": 0, "value": "marko" }] }
        });
        let GValue::Vertex(vertex) = GValue::decode(&vertex).unwrap() else {
            panic!("expected a vertex");
        };
        assert_eq!(vertex.id, EntityId::Number(1));
        assert_eq!(vertex.properties["name"], GValue::String("marko".into()));
    }

    #[test]
    fn test_unknown_tag_decodes_payload() {
        assert_eq!(
            GValue::decode(&typed("gx:BigDecimal", json!(12))).unwrap(),
            GValue::Int(12)
        );
    }

    #[test]
    fn test_decode_results_envelopes() {
        let server = json!({ "result": { "data": typed("g:List", json!([typed("g:Int64", json!(3))])) } });
        assert_eq!(decode_results(&server).unwrap(), vec![GValue::Int(3)]);

        let plain = json!({ "results": [1, 2] });
        assert_eq!(decode_results(&plain).unwrap().len(), 2);

        assert!(decode_results(&json!({ "data": [] })).is_err());
    }

    #[test]
    fn test_missing_edge_endpoint_is_rejected() {
        let edge = typed("g:Edge", json!({ "id": "e1", "label": "route", "outV": "1" }));
        assert!(matches!(GValue::decode(&edge), Err(ConnectorError::Validation(_))));
    }
}
