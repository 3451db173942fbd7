use std::path::PathBuf;

use axum_test::TestServer;
use axum_test::http::StatusCode;
use mongodb::Client;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

use bertron_ingest::{Ingestor, SchemaDocument};
use bertron_routes::service::EntityService;
use bertron_routes::state::{BertronAppState, VersionInfo};
use repositories::mongodb::entities::EntityRepo;

const TEST_DB: &str = "bertron_test";

struct TestRuntime {
    _container: ContainerAsync<Mongo>,
    server: TestServer,
    repo: EntityRepo,
}

#[fixture]
async fn runtime() -> TestRuntime {
    let container = Mongo::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let client = Client::with_uri_str(format!("mongodb://{host}:{port}/"))
        .await
        .unwrap();
    let repo = EntityRepo::new(client, TEST_DB);

    let state = BertronAppState::new(
        EntityService::new(repo.clone()),
        VersionInfo {
            api: Some(env!("CARGO_PKG_VERSION").to_string()),
            bertron_schema: None,
        },
    );

    TestRuntime {
        _container: container,
        server: TestServer::new(bertron_routes::routes::build(state)).unwrap(),
        repo,
    }
}

fn test_schema() -> SchemaDocument {
    SchemaDocument::from_value(json!({
        "version": "v0.1.0-test",
        "type": "object",
        "required": ["id", "uri", "ber_data_source", "entity_type", "coordinates"]
    }))
    .unwrap()
}

fn emsl_record() -> Value {
    json!({
        "id": "EMSL:abc",
        "uri": "https://x/abc",
        "name": "S",
        "ber_data_source": "EMSL",
        "entity_type": ["sample"],
        "coordinates": {"latitude": 34, "longitude": 118}
    })
}

/// Write records to a scratch file and run them through the full pipeline,
/// indexes included, the way the ingest binary would.
async fn ingest(repo: &EntityRepo, label: &str, records: Value) -> bertron_ingest::IngestStats {
    let path = scratch_file(label, &records.to_string());

    let ingestor = Ingestor::new(repo.clone(), test_schema());
    ingestor.ensure_indexes().await.unwrap();
    let stats = ingestor.ingest_file(&path).await;

    let _ = std::fs::remove_file(&path);
    stats
}

fn scratch_file(label: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("bertron-api-{label}-{}.json", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[rstest]
#[tokio::test]
async fn health_reports_a_reachable_database(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    let response = runtime.server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["web_server"], json!(true));
    assert_eq!(body["database"], json!(true));
}

#[rstest]
#[tokio::test]
async fn version_reports_the_api(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    let body: Value = runtime.server.get("/version").await.json();
    assert!(body["api"].is_string());
    assert_eq!(body["bertron_schema"], Value::Null);
}

#[rstest]
#[tokio::test]
async fn get_all_is_404_before_any_ingest(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    let response = runtime.server.get("/bertron").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn ingested_entity_round_trips_through_the_api(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    let stats = ingest(&runtime.repo, "roundtrip", emsl_record()).await;
    assert_eq!(stats.inserted, 1);

    // exact-id lookup, sanitized
    let response = runtime.server.get("/bertron/EMSL:abc").await;
    response.assert_status_ok();
    let entity: Value = response.json();
    assert_eq!(entity["id"], json!("EMSL:abc"));
    assert_eq!(entity["coordinates"]["latitude"], json!(34.0));
    assert!(entity.get("geojson").is_none());
    assert!(entity.get("_metadata").is_none());

    // close to the sample's location: included
    let nearby: Value = runtime
        .server
        .get("/bertron/geo/nearby?latitude=34&longitude=118&radius_meters=1000")
        .await
        .json();
    assert_eq!(nearby["count"], json!(1));

    // the null island control: excluded
    let elsewhere: Value = runtime
        .server
        .get("/bertron/geo/nearby?latitude=0&longitude=0&radius_meters=1000")
        .await
        .json();
    assert_eq!(elsewhere["count"], json!(0));
}

#[rstest]
#[tokio::test]
async fn reingesting_the_same_uri_keeps_one_document(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    ingest(&runtime.repo, "idempotent-a", emsl_record()).await;
    let second = ingest(&runtime.repo, "idempotent-b", emsl_record()).await;
    assert_eq!(second.inserted, 0);

    let body: Value = runtime.server.get("/bertron").await.json();
    assert_eq!(body["count"], json!(1));
}

#[rstest]
#[tokio::test]
async fn find_switches_shape_on_projection(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    ingest(&runtime.repo, "find-shape", emsl_record()).await;

    let plain: Value = runtime
        .server
        .post("/bertron/find")
        .json(&json!({"filter": {"ber_data_source": "EMSL"}, "limit": 10}))
        .await
        .json();
    assert_eq!(plain["count"], json!(1));
    assert!(plain["documents"][0].get("geojson").is_none());

    let projected: Value = runtime
        .server
        .post("/bertron/find")
        .json(&json!({"filter": {}, "projection": {"id": 1, "geojson": 1}, "limit": 10}))
        .await
        .json();
    assert_eq!(projected["count"], json!(1));
    assert!(projected["documents"][0].get("geojson").is_some());
    assert!(projected["documents"][0].get("_id").is_none());
}

#[rstest]
#[tokio::test]
async fn find_with_invalid_operator_is_400(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    ingest(&runtime.repo, "find-invalid", emsl_record()).await;

    let response = runtime
        .server
        .post("/bertron/find")
        .json(&json!({"filter": {"$invalid": "operator"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("Query error"));
}

#[rstest]
#[tokio::test]
async fn bbox_includes_and_excludes(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    ingest(
        &runtime.repo,
        "bbox",
        json!([{
            "id": "doi:10.15485/2441497",
            "uri": "https://x/doi",
            "name": "NGEE Arctic",
            "ber_data_source": "ESS-DIVE",
            "entity_type": ["dataset"],
            "coordinates": {"latitude": 64.847286, "longitude": -163.719936}
        }]),
    )
    .await;

    let alaska: Value = runtime
        .server
        .get("/bertron/geo/bbox?southwest_lat=64&southwest_lng=-166&northeast_lat=66&northeast_lng=-163")
        .await
        .json();
    assert_eq!(alaska["count"], json!(1));

    let pacific: Value = runtime
        .server
        .get("/bertron/geo/bbox?southwest_lat=30&southwest_lng=110&northeast_lat=40&northeast_lng=120")
        .await
        .json();
    assert_eq!(pacific["count"], json!(0));
}

#[rstest]
#[tokio::test]
async fn nearby_with_filter_json_narrows_the_result(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    ingest(&runtime.repo, "nearby-filter", emsl_record()).await;

    let response = runtime
        .server
        .get("/bertron/geo/nearby")
        .add_query_param("latitude", 34)
        .add_query_param("longitude", 118)
        .add_query_param("radius_meters", 1000)
        .add_query_param("filter_json", r#"{"ber_data_source": "NMDC"}"#)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["count"], json!(0));
}
