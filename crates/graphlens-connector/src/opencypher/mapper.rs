use super::response::{self, CypherEntity, CypherNode, CypherRelationship, Row};
use crate::error::ConnectorResult;
use graphlens_core::{
    Bundle, Edge, EdgeConnection, EdgeId, EntityCollector, EntityProperties, EntityValue,
    MappedQueryResults, Scalar, Vertex, VertexId,
};
use graphlens_query::literal::TYPE_SEPARATOR;
use serde_json::{Map, Value};

fn attributes(properties: &Map<String, Value>) -> EntityProperties {
    properties
        .iter()
        .filter_map(|(name, value)| EntityValue::from_json(value).map(|v| (name.clone(), v)))
        .collect()
}

pub fn map_node(node: &CypherNode) -> Vertex {
    let mut vertex = Vertex::with_types(VertexId::from(node.id.clone()), node.labels.clone());
    vertex.attributes = attributes(&node.properties);
    vertex
}

pub fn map_relationship(rel: &CypherRelationship) -> Edge {
    let mut edge = Edge::new(
        EdgeId::from(rel.id.clone()),
        rel.rel_type.clone(),
        VertexId::from(rel.start.clone()),
        VertexId::from(rel.end.clone()),
    );
    edge.attributes = attributes(&rel.properties);
    edge
}

/// Compound type key of a label set
pub fn type_key(labels: &[String]) -> String {
    labels.join(TYPE_SEPARATOR)
}

/// Rows of `RETURN vObjects, eObjects`
pub fn neighbors(rows: &[Row]) -> ConnectorResult<(Vec<Vertex>, Vec<Edge>)> {
    let mut collector = EntityCollector::new();
    for row in rows {
        for node in response::nodes(row, "vObjects")? {
            collector.add_vertex(map_node(&node));
        }
        for rel in response::relationships(row, "eObjects")? {
            collector.add_edge(map_relationship(&rel));
        }
    }
    let results = collector.into_results();
    Ok((results.vertices, results.edges))
}

pub fn vertices(rows: &[Row], column: &str) -> ConnectorResult<Vec<Vertex>> {
    let mut collector = EntityCollector::new();
    for row in rows {
        collector.add_vertex(map_node(&response::node(row, column)?));
    }
    Ok(collector.into_results().vertices)
}

pub fn edges(rows: &[Row], column: &str) -> ConnectorResult<Vec<Edge>> {
    let mut collector = EntityCollector::new();
    for row in rows {
        collector.add_edge(map_relationship(&response::relationship(row, column)?));
    }
    Ok(collector.into_results().edges)
}

/// `(labelColumn, count)` rows keyed by compound type
pub fn label_counts(rows: &[Row], label_column: &str) -> ConnectorResult<Vec<(String, u64)>> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for row in rows {
        let key = type_key(&response::labels(row, label_column)?);
        let count = response::count(row, "count")?;
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += count,
            None => counts.push((key, count)),
        }
    }
    Ok(counts)
}

/// One connection per source label, target label and relationship type
pub fn edge_connections(rows: &[Row]) -> ConnectorResult<Vec<EdgeConnection>> {
    let mut connections = Vec::new();
    for row in rows {
        let edge_type = type_key(&response::labels(row, "edgeType")?);
        let count = response::count(row, "count")?;
        let sources = response::labels(row, "sourceLabels")?;
        let targets = response::labels(row, "targetLabels")?;
        connections.push(EdgeConnection {
            source_vertex_type: type_key(&sources),
            edge_type,
            target_vertex_type: type_key(&targets),
            count: Some(count),
        });
    }
    connections.sort();
    connections.dedup_by(|a, b| {
        let same = a.source_vertex_type == b.source_vertex_type
            && a.edge_type == b.edge_type
            && a.target_vertex_type == b.target_vertex_type;
        if same {
            b.count = Some(b.count.unwrap_or(0) + a.count.unwrap_or(0));
        }
        same
    });
    Ok(connections)
}

/// Walk arbitrary rows
///
/// Nodes and relationships anywhere are extracted; a row of primitives is a
/// bundle, or a named scalar when it has a single column.
pub fn raw(rows: &[Row]) -> ConnectorResult<MappedQueryResults> {
    let mut collector = EntityCollector::new();
    for row in rows {
        let primitive_row = row.values().all(is_primitive);
        if primitive_row && row.len() > 1 {
            let values = row
                .iter()
                .filter_map(|(k, v)| EntityValue::from_json(v).map(|v| Scalar::named(k.clone(), v)))
                .collect();
            collector.add_bundle(Bundle { name: None, values });
            continue;
        }
        for (name, value) in row {
            walk(value, Some(name.clone()), &mut collector)?;
        }
    }
    Ok(collector.into_results())
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn walk(value: &Value, name: Option<String>, collector: &mut EntityCollector) -> ConnectorResult<()> {
    if let Some(entity) = CypherEntity::detect(value) {
        match entity? {
            CypherEntity::Node(node) => collector.add_vertex(map_node(&node)),
            CypherEntity::Relationship(rel) => collector.add_edge(map_relationship(&rel)),
        }
        return Ok(());
    }
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, name.clone(), collector)?;
            }
        }
        Value::Object(object) => {
            for (key, item) in object {
                walk(item, Some(key.clone()), collector)?;
            }
        }
        primitive => {
            if let Some(value) = EntityValue::from_json(primitive) {
                collector.add_scalar(Scalar::new(name, value));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(body: Value) -> Vec<Row> {
        response::rows(&body).unwrap()
    }

    #[test]
    fn test_neighbors_mapping() {
        let rows = rows(json!({ "results": [{
            "vObjects": [
                { "~id": "2", "~entityType": "node", "~labels": ["airport"], "~properties": { "code": "LAX", "runways": 4 } },
                { "~id": "3", "~entityType": "node", "~labels": ["country"], "~properties": {} }
            ],
            "eObjects": [
                { "~id": "r1", "~entityType": "relationship", "~type": "route", "~start": "1", "~end": "2", "~properties": { "dist": 954 } },
                { "~id": "r2", "~entityType": "relationship", "~type": "contains", "~start": "3", "~end": "1", "~properties": {} }
            ]
        }]}));
        let (vertices, edges) = neighbors(&rows).unwrap();
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].attributes["runways"], EntityValue::Number(4.0));
        assert_eq!(edges[0].source_id, VertexId::from("1"));
        assert_eq!(edges[0].attributes["dist"], EntityValue::Number(954.0));
        assert_eq!(edges[1].edge_type, "contains");
    }

    #[test]
    fn test_null_property_is_dropped() {
        let node: CypherNode = serde_json::from_value(json!({
            "~id": "1", "~labels": ["airport"], "~properties": { "code": "SEA", "closed": null }
        }))
        .unwrap();
        let vertex = map_node(&node);
        assert!(!vertex.attributes.contains_key("closed"));
    }

    #[test]
    fn test_label_counts_merge_compound_keys() {
        let rows = rows(json!({ "results": [
            { "label": ["airport"], "count": 3 },
            { "label": ["airport", "hub"], "count": 1 },
            { "label": ["airport"], "count": 2 }
        ]}));
        assert_eq!(
            label_counts(&rows, "label").unwrap(),
            vec![("airport".to_string(), 5), ("airport::hub".to_string(), 1)]
        );
    }

    #[test]
    fn test_edge_connections() {
        let rows = rows(json!({ "results": [
            { "sourceLabels": ["airport"], "edgeType": "route", "targetLabels": ["airport"], "count": 10 },
            { "sourceLabels": ["country"], "edgeType": "contains", "targetLabels": ["airport"], "count": 2 }
        ]}));
        let connections = edge_connections(&rows).unwrap();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].source_vertex_type, "airport");
        assert_eq!(connections[1].count, Some(2));
    }

    #[test]
    fn test_raw_rows() {
        let rows = rows(json!({ "results": [
            { "v": { "~id": "1", "~entityType": "node", "~labels": ["airport"], "~properties": {} } },
            { "code": "SEA", "runways": 3 },
            { "total": 7 }
        ]}));
        let results = raw(&rows).unwrap();
        assert_eq!(results.vertices.len(), 1);
        assert_eq!(results.bundles.len(), 1);
        assert_eq!(results.scalars, vec![Scalar::named("total", 7i64)]);
    }
}
