//! openCypher connector against scripted `~id` / `~labels` responses

mod common;

use common::connect;
use common::cypher::{node, relationship, response};
use graphlens_config::QueryEngine;
use graphlens_connector::ConnectorError;
use graphlens_core::test_utils::MockTransport;
use graphlens_core::{
    AttributeDataType, CancellationToken, CountsByTypeRequest, Criterion, EdgeConnectionsRequest,
    EdgeDetailsRequest, EdgeId, EntityValue, NeighborsCountRequest, NeighborsRequest,
    Operator, RawQueryRequest, VertexId,
};
use serde_json::json;

#[tokio::test]
async fn test_neighbors_round_trip() {
    let reply = response(vec![json!({
        "vObjects": [
            node("2", &["airport"], json!({ "code": "SEA", "longest": 11901 })),
            node("3", &["airport", "hub"], json!({ "code": "ATL" })),
        ],
        "eObjects": [
            relationship("r1", "route", "1", "2"),
            relationship("r2", "route", "3", "1"),
        ]
    })]);
    let (connector, transport) = connect(
        QueryEngine::OpenCypher,
        MockTransport::new().respond("RETURN vObjects, eObjects", reply),
    );

    let request = NeighborsRequest::new("1")
        .with_edge_types(["route"])
        .with_criterion(
            Criterion::new("longest", Operator::Gte, 10000).with_data_type(AttributeDataType::Number),
        );
    let response = connector
        .fetch_neighbors(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.vertices.len(), 2);
    assert_eq!(response.vertices[0].attributes["longest"], EntityValue::Number(11901.0));
    assert_eq!(response.vertices[1].types, vec!["airport", "hub"]);
    assert_eq!(response.edges[1].source_id, VertexId::from("3"));
    assert_eq!(response.edges[1].target_id, VertexId::from("1"));

    let calls = transport.calls();
    assert!(calls[0].contains("[e:route]"));
    assert!(calls[0].contains("tgt.longest >= 10000"));
}

#[tokio::test]
async fn test_neighbor_counts_total_and_labels() {
    let reply = response(vec![
        json!({ "vertexLabels": ["airport"], "count": 4 }),
        json!({ "vertexLabels": ["airport", "hub"], "count": 1 }),
        json!({ "vertexLabels": ["country"], "count": 1 }),
    ]);
    let (connector, _) = connect(
        QueryEngine::OpenCypher,
        MockTransport::new().respond("AS vertexLabels", reply),
    );

    let counts = connector
        .neighbor_counts(&NeighborsCountRequest::new("1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(counts.total_count, 6);
    assert_eq!(counts.counts["airport"], 5);
    assert_eq!(counts.counts["hub"], 1);
    assert_eq!(counts.counts["country"], 1);
}

#[tokio::test]
async fn test_schema_discovery() {
    let transport = MockTransport::new()
        .respond(
            "MATCH (v) RETURN labels(v) AS label",
            response(vec![json!({ "label": ["airport"], "count": 3 })]),
        )
        .respond(
            "MATCH ()-[e]->() RETURN type(e) AS label",
            response(vec![json!({ "label": "route", "count": 5 })]),
        )
        .respond(
            "MATCH (v:airport) RETURN v",
            response(vec![
                json!({ "v": node("1", &["airport"], json!({ "code": "SEA", "elev": 433 })) }),
                json!({ "v": node("2", &["airport"], json!({ "opened": true })) }),
            ]),
        )
        .respond(
            "MATCH ()-[e:route]->() RETURN e",
            response(vec![json!({ "e": relationship("r1", "route", "1", "2") })]),
        )
        .respond(
            "MATCH (source)-[e]->(target)",
            response(vec![
                json!({ "sourceLabels": ["airport"], "edgeType": "route", "targetLabels": ["airport"], "count": 3 }),
                json!({ "sourceLabels": ["airport"], "edgeType": "route", "targetLabels": ["airport"], "count": 2 }),
            ]),
        );
    let (connector, _) = connect(QueryEngine::OpenCypher, transport);

    let schema = connector.fetch_schema(&CancellationToken::new()).await.unwrap();

    assert_eq!(schema.total_vertices, 3);
    assert_eq!(schema.total_edges, 5);
    let attributes: Vec<_> = schema.vertices[0]
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a.data_type))
        .collect();
    assert_eq!(
        attributes,
        vec![
            ("code", AttributeDataType::String),
            ("elev", AttributeDataType::Number),
            ("opened", AttributeDataType::Boolean),
        ]
    );
    assert!(schema.edges[0].attributes.is_empty());

    let connections = schema.edge_connections.unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].count, Some(5));
}

#[tokio::test]
async fn test_edge_connections_filtered_by_type() {
    let (connector, transport) = connect(
        QueryEngine::OpenCypher,
        MockTransport::new().respond(
            "MATCH (source)-[e]->(target)",
            response(vec![json!({
                "sourceLabels": ["country"],
                "edgeType": "contains",
                "targetLabels": ["airport"],
                "count": 12
            })]),
        ),
    );

    let request = EdgeConnectionsRequest {
        edge_types: vec!["contains".into()],
    };
    let connections = connector
        .fetch_edge_connections(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(connections[0].target_vertex_type, "airport");
    assert!(transport.calls()[0].contains(r#"type(e) IN ["contains"]"#));
}

#[tokio::test]
async fn test_counts_by_type_and_edge_details() {
    let transport = MockTransport::new()
        .respond("RETURN count(v) AS total", response(vec![json!({ "total": 17 })]))
        .respond(
            "WHERE ID(e) IN",
            response(vec![json!({ "e": relationship("r1", "route", "1", "2") })]),
        );
    let (connector, _) = connect(QueryEngine::OpenCypher, transport);
    let cancel = CancellationToken::new();

    let counts = connector
        .fetch_vertex_counts_by_type(
            &CountsByTypeRequest {
                label: "airport".into(),
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(counts.total, 17);

    let details = connector
        .edge_details(
            &EdgeDetailsRequest {
                edge_ids: vec!["r1".into(), "r404".into()],
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(details.edges.len(), 1);
    assert_eq!(details.edges[0].id, EdgeId::from("r1"));
}

#[tokio::test]
async fn test_malformed_node_is_a_validation_error() {
    let reply = response(vec![json!({
        "vObjects": [{ "~labels": ["airport"] }],
        "eObjects": []
    })]);
    let (connector, _) = connect(
        QueryEngine::OpenCypher,
        MockTransport::new().respond("RETURN vObjects, eObjects", reply),
    );

    let err = connector
        .fetch_neighbors(&NeighborsRequest::new("1"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Validation(_)));
}

#[tokio::test]
async fn test_raw_query_bundles_and_entities() {
    let reply = response(vec![
        json!({ "code": "SEA", "runways": 3 }),
        json!({ "v": node("1", &["airport"], json!({})) }),
    ]);
    let (connector, _) = connect(QueryEngine::OpenCypher, MockTransport::new().respond("MATCH", reply));

    let results = connector
        .raw_query(
            &RawQueryRequest {
                query: "MATCH (v) RETURN v LIMIT 2".into(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(results.bundles.len(), 1);
    assert_eq!(results.bundles[0].values.len(), 2);
    assert_eq!(results.vertices.len(), 1);
}
