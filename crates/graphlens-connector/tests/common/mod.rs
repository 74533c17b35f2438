//! Wire fixtures shared by the connector integration tests

#![allow(dead_code)]

use graphlens_config::{ConnectionConfig, QueryEngine};
use graphlens_connector::{connector_from_config, GraphConnector};
use graphlens_core::test_utils::MockTransport;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn connect(engine: QueryEngine, transport: MockTransport) -> (Box<dyn GraphConnector>, Arc<MockTransport>) {
    connect_with(ConnectionConfig::for_engine(engine), transport)
}

pub fn connect_with(
    config: ConnectionConfig,
    transport: MockTransport,
) -> (Box<dyn GraphConnector>, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let connector = connector_from_config(&config, transport.clone()).expect("valid config");
    (connector, transport)
}

pub mod graphson {
    use super::*;

    pub fn typed(tag: &str, value: Value) -> Value {
        json!({ "@type": tag, "@value": value })
    }

    pub fn long(n: i64) -> Value {
        typed("g:Int64", json!(n))
    }

    pub fn list(items: Vec<Value>) -> Value {
        typed("g:List", Value::Array(items))
    }

    /// `g:Map` payloads alternate keys and values
    pub fn map(entries: Vec<(Value, Value)>) -> Value {
        typed(
            "g:Map",
            Value::Array(entries.into_iter().flat_map(|(k, v)| [k, v]).collect()),
        )
    }

    pub fn vertex(id: i64, label: &str, properties: &[(&str, Value)]) -> Value {
        let properties: serde_json::Map<String, Value> = properties
            .iter()
            .enumerate()
            .map(|(i, (key, value))| {
                let property = typed(
                    "g:VertexProperty",
                    json!({ "id": long(id * 100 + i as i64), "label": key, "value": value }),
                );
                (key.to_string(), json!([property]))
            })
            .collect();
        typed(
            "g:Vertex",
            json!({ "id": long(id), "label": label, "properties": properties }),
        )
    }

    pub fn edge(id: &str, label: &str, out_v: i64, in_v: i64) -> Value {
        typed(
            "g:Edge",
            json!({ "id": id, "label": label, "outV": long(out_v), "inV": long(in_v) }),
        )
    }

    /// Gremlin Server envelope
    pub fn response(items: Vec<Value>) -> Value {
        json!({ "result": { "data": list(items) } })
    }
}

pub mod cypher {
    use super::*;

    pub fn node(id: &str, labels: &[&str], properties: Value) -> Value {
        json!({ "~id": id, "~entityType": "node", "~labels": labels, "~properties": properties })
    }

    pub fn relationship(id: &str, rel_type: &str, start: &str, end: &str) -> Value {
        json!({ "~id": id, "~entityType": "relationship", "~type": rel_type, "~start": start, "~end": end, "~properties": {} })
    }

    pub fn response(rows: Vec<Value>) -> Value {
        json!({ "results": rows })
    }
}

pub mod sparql {
    use super::*;

    pub fn uri(value: &str) -> Value {
        json!({ "type": "uri", "value": value })
    }

    pub fn bnode(value: &str) -> Value {
        json!({ "type": "bnode", "value": value })
    }

    pub fn literal(value: &str) -> Value {
        json!({ "type": "literal", "value": value })
    }

    pub fn typed_literal(value: &str, datatype: &str) -> Value {
        json!({ "type": "literal", "value": value, "datatype": datatype })
    }

    pub fn triple(subject: Value, predicate: &str, object: Value) -> Value {
        json!({ "subject": subject, "predicate": uri(predicate), "object": object })
    }

    pub fn response(vars: &[&str], bindings: Vec<Value>) -> Value {
        json!({ "head": { "vars": vars }, "results": { "bindings": bindings } })
    }

    pub fn triples(bindings: Vec<Value>) -> Value {
        response(&["subject", "predicate", "object"], bindings)
    }
}
