use bson::{Document, doc};
use chrono::Utc;
use mongodb::Client;
use rstest::{fixture, rstest};
use serde_json::json;
use tokio_stream::StreamExt;
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

use bertron_core::geo::{BoundingBox, GeoJsonPoint, GeoPoint};
use bertron_core::query::{FindCriteria, FindOutcome, IngestMetadata, NewEntityDocument, UpsertOutcome};
use bertron_core::result::EntityRepoError;
use bertron_core::{EntityRepository, JsonObject};
use repositories::mongodb::entities::{ENTITIES_COLLECTION_NAME, EntityRepo};

const TEST_DB: &str = "bertron_test";

struct TestRuntime {
    _container: ContainerAsync<Mongo>,
    repo: EntityRepo,
    client: Client,
}

#[fixture]
async fn runtime() -> TestRuntime {
    let container = Mongo::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let client = Client::with_uri_str(format!("mongodb://{host}:{port}/"))
        .await
        .unwrap();

    TestRuntime {
        repo: EntityRepo::new(client.clone(), TEST_DB),
        _container: container,
        client,
    }
}

fn sample_document(id: &str, uri: &str, latitude: f64, longitude: f64) -> NewEntityDocument {
    let record = json!({
        "id": id,
        "uri": uri,
        "name": format!("Sample {id}"),
        "description": "integration test record",
        "ber_data_source": "EMSL",
        "entity_type": ["sample"],
        "coordinates": {"latitude": latitude, "longitude": longitude}
    });
    NewEntityDocument::new(
        uri.to_string(),
        object(record),
        GeoJsonPoint::new(longitude, latitude),
        IngestMetadata {
            ingested_at: Utc::now(),
            schema_version: "v0.1.0-test".to_string(),
        },
    )
}

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test records are objects"),
    }
}

#[rstest]
#[tokio::test]
async fn upsert_same_uri_never_duplicates(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repo;

    let first = repo
        .upsert(sample_document("EMSL:a", "https://x/a", 34.0, 118.0))
        .await
        .unwrap();
    assert_eq!(first, UpsertOutcome::Inserted);

    for _ in 0..2 {
        let again = repo
            .upsert(sample_document("EMSL:a", "https://x/a", 35.0, 119.0))
            .await
            .unwrap();
        assert_eq!(again, UpsertOutcome::Updated);
    }

    let stored: Vec<Document> = collection(&runtime.client)
        .find(doc! { "uri": "https://x/a" })
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(stored.len(), 1);
    // last write wins on field content
    let coordinates = stored[0].get_document("coordinates").unwrap();
    assert_eq!(coordinates.get_f64("latitude").unwrap(), 35.0);
}

#[rstest]
#[tokio::test]
async fn stored_document_carries_derived_fields(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    runtime
        .repo
        .upsert(sample_document("EMSL:b", "https://x/b", 34.0, 118.0))
        .await
        .unwrap();

    let stored = collection(&runtime.client)
        .find_one(doc! { "uri": "https://x/b" })
        .await
        .unwrap()
        .unwrap();

    let geojson = stored.get_document("geojson").unwrap();
    assert_eq!(geojson.get_str("type").unwrap(), "Point");
    let coordinates = geojson.get_array("coordinates").unwrap();
    assert_eq!(coordinates[0].as_f64().unwrap(), 118.0);
    assert_eq!(coordinates[1].as_f64().unwrap(), 34.0);

    let metadata = stored.get_document("_metadata").unwrap();
    assert!(metadata.get_datetime("ingested_at").is_ok());
    assert_eq!(metadata.get_str("schema_version").unwrap(), "v0.1.0-test");
}

#[rstest]
#[tokio::test]
async fn get_all_without_collection_is_missing(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;

    let err = runtime.repo.get_all().await.unwrap_err();
    assert!(matches!(
        err.current_context(),
        EntityRepoError::CollectionMissing
    ));
}

#[rstest]
#[tokio::test]
async fn get_all_on_empty_collection_is_empty_not_missing(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .client
        .database(TEST_DB)
        .create_collection(ENTITIES_COLLECTION_NAME)
        .await
        .unwrap();

    let entities = runtime.repo.get_all().await.unwrap();
    assert!(entities.is_empty());
}

#[rstest]
#[tokio::test]
async fn get_all_reconstructs_canonical_entities(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:c", "https://x/c", 34.0, 118.0))
        .await
        .unwrap();

    let entities = runtime.repo.get_all().await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id, "EMSL:c");

    let as_json = serde_json::to_value(&entities[0]).unwrap();
    assert!(as_json.get("geojson").is_none());
    assert!(as_json.get("_metadata").is_none());
}

#[rstest]
#[tokio::test]
async fn get_by_id_matches_logical_id_not_uri(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("nmdc:bsm-11", "https://x/nmdc-11", 28.1, -81.4))
        .await
        .unwrap();

    let found = runtime.repo.get_by_id("nmdc:bsm-11").await.unwrap();
    assert!(found.is_some());

    let by_uri = runtime.repo.get_by_id("https://x/nmdc-11").await.unwrap();
    assert!(by_uri.is_none());
}

#[rstest]
#[tokio::test]
async fn find_without_projection_returns_entities(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:d", "https://x/d", 34.0, 118.0))
        .await
        .unwrap();

    let mut filter = JsonObject::new();
    filter.insert("ber_data_source".to_string(), json!("EMSL"));

    let outcome = runtime.repo.find(FindCriteria::new(filter)).await.unwrap();
    match outcome {
        FindOutcome::Entities(entities) => assert_eq!(entities.len(), 1),
        FindOutcome::Projected(_) => panic!("no projection was supplied"),
    }
}

#[rstest]
#[tokio::test]
async fn find_with_projection_returns_raw_documents(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:e", "https://x/e", 34.0, 118.0))
        .await
        .unwrap();

    let mut criteria = FindCriteria::new(JsonObject::new());
    let mut projection = JsonObject::new();
    projection.insert("id".to_string(), json!(1));
    projection.insert("geojson".to_string(), json!(1));
    criteria.projection = Some(projection);

    let outcome = runtime.repo.find(criteria).await.unwrap();
    match outcome {
        FindOutcome::Projected(documents) => {
            assert_eq!(documents.len(), 1);
            // projected mode hands back whatever was asked for, even
            // storage-only fields, but never the store-internal _id
            assert!(documents[0].get("geojson").is_some());
            assert!(documents[0].get("_id").is_none());
        }
        FindOutcome::Entities(_) => panic!("projection was supplied"),
    }
}

#[rstest]
#[tokio::test]
async fn find_with_unknown_operator_is_rejected(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:f", "https://x/f", 34.0, 118.0))
        .await
        .unwrap();

    let mut filter = JsonObject::new();
    filter.insert("$invalid".to_string(), json!("operator"));

    let err = runtime
        .repo
        .find(FindCriteria::new(filter))
        .await
        .unwrap_err();
    assert!(matches!(
        err.current_context(),
        EntityRepoError::QueryRejected(_)
    ));
}

#[rstest]
#[tokio::test]
async fn nearby_honors_the_radius_cutoff(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:g", "https://x/g", 34.0, 118.0))
        .await
        .unwrap();
    runtime.repo.ensure_indexes().await.unwrap();

    let near = runtime
        .repo
        .find_nearby(GeoPoint::new(34.0, 118.0), 1000.0, None)
        .await
        .unwrap();
    assert_eq!(near.len(), 1);

    let far = runtime
        .repo
        .find_nearby(GeoPoint::new(0.0, 0.0), 1000.0, None)
        .await
        .unwrap();
    assert!(far.is_empty());
}

#[rstest]
#[tokio::test]
async fn nearby_extra_filter_is_conjunctive(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:h", "https://x/h", 34.0, 118.0))
        .await
        .unwrap();
    runtime.repo.ensure_indexes().await.unwrap();

    let mut filter = JsonObject::new();
    filter.insert("ber_data_source".to_string(), json!("NMDC"));

    let none = runtime
        .repo
        .find_nearby(GeoPoint::new(34.0, 118.0), 1000.0, Some(filter))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[rstest]
#[tokio::test]
async fn bbox_contains_and_excludes(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("ESS-DIVE:i", "https://x/i", 64.8, -163.7))
        .await
        .unwrap();
    runtime.repo.ensure_indexes().await.unwrap();

    let alaska = BoundingBox::new(GeoPoint::new(64.0, -166.0), GeoPoint::new(66.0, -163.0)).unwrap();
    let inside = runtime.repo.find_in_bbox(alaska, None).await.unwrap();
    assert_eq!(inside.len(), 1);

    let elsewhere =
        BoundingBox::new(GeoPoint::new(30.0, 110.0), GeoPoint::new(40.0, 120.0)).unwrap();
    let outside = runtime.repo.find_in_bbox(elsewhere, None).await.unwrap();
    assert!(outside.is_empty());
}

#[rstest]
#[tokio::test]
async fn clean_drops_the_collection(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:j", "https://x/j", 34.0, 118.0))
        .await
        .unwrap();

    runtime.repo.clean().await.unwrap();

    let err = runtime.repo.get_all().await.unwrap_err();
    assert!(matches!(
        err.current_context(),
        EntityRepoError::CollectionMissing
    ));

    // dropping again is fine
    runtime.repo.clean().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn ensure_indexes_is_idempotent(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    runtime
        .repo
        .upsert(sample_document("EMSL:k", "https://x/k", 34.0, 118.0))
        .await
        .unwrap();

    runtime.repo.ensure_indexes().await.unwrap();
    runtime.repo.ensure_indexes().await.unwrap();

    let indexes = collection(&runtime.client)
        .list_index_names()
        .await
        .unwrap();
    assert!(indexes.iter().any(|name| name.contains("geojson")));
    assert!(indexes.iter().any(|name| name.contains("uri")));
}

fn collection(client: &Client) -> mongodb::Collection<Document> {
    client
        .database(TEST_DB)
        .collection::<Document>(ENTITIES_COLLECTION_NAME)
}
