//! End-to-end pipeline tests: mock FHIR server → mappers → memory store →
//! resolve pass.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fhirgraph_client::FhirClient;
use fhirgraph_core::{NodeKey, PlaceholderKey};
use fhirgraph_engine::{RunConfig, run};
use fhirgraph_graph::{EdgeTarget, GraphStore, MemoryStore};
use fhirgraph_model::MapperRegistry;

async fn mount_type(server: &MockServer, resource_type: &str, entries: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/{resource_type}")))
        .and(query_param("_summary", "count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": entries.len()
        })))
        .mount(server)
        .await;

    let entry: Vec<serde_json::Value> = entries
        .into_iter()
        .map(|resource| json!({"resource": resource}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/{resource_type}")))
        .and(query_param("_count", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": entry,
            "link": []
        })))
        .mount(server)
        .await;
}

fn config(resource_types: &[&str]) -> RunConfig {
    RunConfig {
        resource_types: resource_types.iter().map(|t| t.to_string()).collect(),
        page_size: 50,
        ..RunConfig::default()
    }
}

fn patients() -> Vec<serde_json::Value> {
    vec![
        json!({
            "resourceType": "Patient",
            "id": "p1",
            "gender": "female",
            "managingOrganization": {"reference": "Organization/o9"}
        }),
        json!({"resourceType": "Patient", "id": "p2"}),
        json!({
            "resourceType": "Patient",
            "id": "p3",
            "managingOrganization": {
                "identifier": {"system": "urn:org", "value": "abc"}
            }
        }),
    ]
}

#[tokio::test]
async fn logical_reference_becomes_a_placeholder_then_resolves() {
    let server = MockServer::start().await;
    mount_type(&server, "Patient", patients()).await;
    mount_type(
        &server,
        "Organization",
        vec![json!({
            "resourceType": "Organization",
            "id": "o1",
            "name": "General Hospital",
            "identifier": [{"system": "urn:org", "value": "abc"}]
        })],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());
    let client = FhirClient::new(&server.uri());

    // First pass: patients only. The identifier-only reference defers.
    let report = run(
        Some(client.clone()),
        store.clone(),
        registry.clone(),
        &config(&["Patient"]),
    )
    .await
    .unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.written, 3);
    assert_eq!(report.placeholders, 1);
    assert_eq!(report.deferred_references, 1);
    for id in ["p1", "p2", "p3"] {
        assert!(store.has_node(&NodeKey::new("Patient", id)));
    }
    // The literal reference produced a stub Organization node.
    assert!(store.has_node(&NodeKey::new("Organization", "o9")));
    let placeholder = PlaceholderKey::new("Organization", "urn:org", "abc");
    assert_eq!(store.edges_into_placeholder(&placeholder), 1);

    // Second pass: organizations plus the resolve pass.
    let mut resolve_config = config(&["Organization"]);
    resolve_config.resolve = true;
    let report = run(Some(client), store.clone(), registry, &resolve_config)
        .await
        .unwrap();

    assert_eq!(report.resolved, 1);
    assert_eq!(report.unresolved, 0);
    assert_eq!(store.placeholder_count(), 0);
    assert!(store.has_edge(
        &NodeKey::new("Patient", "p3"),
        "MANAGED_BY",
        &EdgeTarget::Node(NodeKey::new("Organization", "o1"))
    ));
}

#[tokio::test]
async fn tolerant_mode_records_invalid_entries_and_continues() {
    let server = MockServer::start().await;
    mount_type(
        &server,
        "Patient",
        vec![
            json!({"resourceType": "Patient", "id": "p1"}),
            json!({"resourceType": "Patient"}),
        ],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());
    let client = FhirClient::new(&server.uri());

    let report = run(Some(client), store.clone(), registry, &config(&["Patient"]))
        .await
        .unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(report.failed, 1);
    assert!(report.failures[0].contains("missing id"));
}

#[tokio::test]
async fn strict_mode_aborts_on_the_first_invalid_entry() {
    let server = MockServer::start().await;
    mount_type(
        &server,
        "Patient",
        vec![
            json!({"resourceType": "Patient", "id": "p1"}),
            json!({"resourceType": "Patient"}),
        ],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());
    let client = FhirClient::new(&server.uri());

    let mut strict_config = config(&["Patient"]);
    strict_config.strict = true;
    let err = run(Some(client), store, registry, &strict_config)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("strict mode"));
}

#[tokio::test]
async fn failing_unit_does_not_abort_the_others() {
    let server = MockServer::start().await;
    // Observation has no mocks: its count request will 404 and the unit
    // fails, but the Patient unit still completes.
    mount_type(
        &server,
        "Patient",
        vec![json!({"resourceType": "Patient", "id": "p1"})],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());
    let client = FhirClient::new(&server.uri());

    let report = run(
        Some(client),
        store.clone(),
        registry,
        &config(&["Observation", "Patient"]),
    )
    .await
    .unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(report.failed, 1);
    assert!(store.has_node(&NodeKey::new("Patient", "p1")));
}

#[tokio::test]
async fn parallel_run_produces_the_same_graph() {
    let server = MockServer::start().await;
    mount_type(&server, "Patient", patients()).await;
    mount_type(
        &server,
        "Organization",
        vec![json!({
            "resourceType": "Organization",
            "id": "o1",
            "identifier": [{"system": "urn:org", "value": "abc"}]
        })],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());
    let client = FhirClient::new(&server.uri());

    let mut parallel_config = config(&["Patient", "Organization"]);
    parallel_config.parallel = true;
    parallel_config.resolve = true;
    let report = run(Some(client), store.clone(), registry, &parallel_config)
        .await
        .unwrap();

    assert_eq!(report.written, 4);
    assert_eq!(report.failed, 0);
    // Whatever the interleaving, the resolve pass leaves no placeholder:
    // either the write matched directly or the placeholder was rewired.
    assert_eq!(store.placeholder_count(), 0);
}

#[tokio::test]
async fn delete_flag_wipes_the_store_first() {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MapperRegistry::with_defaults());

    // Seed some state, then run with only the delete flag.
    let mut batch = fhirgraph_graph::WriteBatch::new();
    batch.push(fhirgraph_graph::WriteOp::UpsertNode(
        fhirgraph_core::GraphNode::new(NodeKey::new("Patient", "stale")),
    ));
    store.apply(&batch).await.unwrap();
    assert_eq!(store.node_count(), 1);

    let delete_config = RunConfig {
        delete_first: true,
        ..RunConfig::default()
    };
    run(None, store.clone(), registry, &delete_config)
        .await
        .unwrap();
    assert_eq!(store.node_count(), 0);
}
