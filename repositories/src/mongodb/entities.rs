use bson::{Bson, Document, doc};
use error_stack::{Report, ResultExt};
use mongodb::error::ErrorKind;
use mongodb::options::{FindOptions, ReplaceOptions};
use mongodb::{Client, Database, IndexModel};
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use bertron_core::geo::{BoundingBox, GeoPoint};
use bertron_core::model::Entity;
use bertron_core::query::{FindCriteria, FindOutcome, NewEntityDocument, UpsertOutcome};
use bertron_core::result::{EntityRepoError, OptRepoResult, RepoResult};
use bertron_core::{EntityRepository, JsonObject};

pub const ENTITIES_COLLECTION_NAME: &str = "entities";

pub enum ConnectionDetails {
    Url(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to create client connection to mongodb instance")]
pub struct ConnectError;

/// MongoDB-backed entity repository. One logical collection of documents,
/// each the canonical entity fields plus `geojson` and `_metadata`.
#[derive(Debug, Clone)]
pub struct EntityRepo {
    db: Database,
}

impl EntityRepo {
    pub fn new(client: Client, db_name: &str) -> Self {
        Self {
            db: client.database(db_name),
        }
    }

    pub async fn init(
        connection_details: ConnectionDetails,
        db_name: &str,
    ) -> Result<EntityRepo, Report<ConnectError>> {
        let client = match connection_details {
            ConnectionDetails::Url(url) => Client::with_uri_str(url)
                .await
                .change_context(ConnectError)?,
        };

        Ok(Self::new(client, db_name))
    }

    fn entities(&self) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(ENTITIES_COLLECTION_NAME)
    }

    /// Distinguishes "collection never created" from "collection empty";
    /// the former is a setup error surfaced as not-found.
    async fn require_collection(&self) -> RepoResult<()> {
        let names = self
            .db
            .list_collection_names()
            .await
            .change_context(EntityRepoError::List)?;

        if names.iter().any(|name| name == ENTITIES_COLLECTION_NAME) {
            Ok(())
        } else {
            Err(Report::new(EntityRepoError::CollectionMissing))
        }
    }

    async fn collect_entities(
        &self,
        filter: Document,
        options: Option<FindOptions>,
        context: fn() -> EntityRepoError,
    ) -> RepoResult<Vec<Entity>> {
        let documents: Vec<Document> = self
            .entities()
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| rejection(e, context()))?
            .collect::<Result<_, _>>()
            .await
            .map_err(|e| rejection(e, context()))?;

        documents.into_iter().map(to_entity).collect()
    }
}

impl EntityRepository for EntityRepo {
    async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    async fn get_all(&self) -> RepoResult<Vec<Entity>> {
        self.require_collection().await?;
        self.collect_entities(Document::new(), None, || EntityRepoError::List)
            .await
    }

    async fn get_by_id(&self, id: &str) -> OptRepoResult<Entity> {
        let document = self
            .entities()
            .find_one(doc! { "id": id })
            .await
            .change_context(EntityRepoError::Get)?;

        document.map(to_entity).transpose()
    }

    async fn find(&self, criteria: FindCriteria) -> RepoResult<FindOutcome> {
        self.require_collection().await?;

        let filter = to_query_document(criteria.filter)?;
        let sort = criteria.sort.map(to_query_document).transpose()?;
        let projection = criteria.projection.map(to_query_document).transpose()?;

        let options = FindOptions::builder()
            .skip(criteria.skip)
            .limit(criteria.limit)
            .sort(sort)
            .projection(projection.clone().map(suppress_internal_id))
            .build();

        debug!("running find with filter {filter:?}");

        let documents: Vec<Document> = self
            .entities()
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| rejection(e, EntityRepoError::Find))?
            .collect::<Result<_, _>>()
            .await
            .map_err(|e| rejection(e, EntityRepoError::Find))?;

        match projection {
            Some(_) => Ok(FindOutcome::Projected(
                documents.into_iter().map(to_json).collect(),
            )),
            None => Ok(FindOutcome::Entities(
                documents
                    .into_iter()
                    .map(to_entity)
                    .collect::<RepoResult<_>>()?,
            )),
        }
    }

    async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        filter: Option<JsonObject>,
    ) -> RepoResult<Vec<Entity>> {
        self.require_collection().await?;

        let mut query = doc! {
            "geojson": {
                "$near": {
                    "$geometry": {
                        "type": "Point",
                        "coordinates": [center.longitude, center.latitude],
                    },
                    "$maxDistance": radius_meters,
                }
            }
        };
        merge_extra_filter(&mut query, filter)?;

        self.collect_entities(query, None, || EntityRepoError::Geo)
            .await
    }

    async fn find_in_bbox(
        &self,
        bounds: BoundingBox,
        filter: Option<JsonObject>,
    ) -> RepoResult<Vec<Entity>> {
        self.require_collection().await?;

        let ring: Vec<Bson> = bounds
            .polygon_ring()
            .iter()
            .map(|corner| Bson::Array(vec![corner[0].into(), corner[1].into()]))
            .collect();

        let mut query = doc! {
            "geojson": {
                "$geoWithin": {
                    "$geometry": {
                        "type": "Polygon",
                        "coordinates": [ring],
                    }
                }
            }
        };
        merge_extra_filter(&mut query, filter)?;

        self.collect_entities(query, None, || EntityRepoError::Geo)
            .await
    }

    async fn upsert(&self, document: NewEntityDocument) -> RepoResult<UpsertOutcome> {
        let mut replacement =
            Document::try_from(document.record).change_context(EntityRepoError::Upsert)?;
        replacement.insert(
            "geojson",
            bson::to_bson(&document.geojson).change_context(EntityRepoError::Upsert)?,
        );
        replacement.insert(
            "_metadata",
            doc! {
                "ingested_at": bson::DateTime::from_chrono(document.metadata.ingested_at),
                "schema_version": &document.metadata.schema_version,
            },
        );

        let options = ReplaceOptions::builder().upsert(true).build();

        let result = self
            .entities()
            .replace_one(doc! { "uri": &document.uri }, replacement)
            .with_options(options)
            .await
            .change_context(EntityRepoError::Upsert)
            .attach_with(|| format!("uri {}", document.uri))?;

        if result.upserted_id.is_some() {
            Ok(UpsertOutcome::Inserted)
        } else {
            Ok(UpsertOutcome::Updated)
        }
    }

    async fn ensure_indexes(&self) -> RepoResult<()> {
        info!("declaring indexes on '{ENTITIES_COLLECTION_NAME}' collection");

        // The id index stays advisory (non-unique): upstream sources do not
        // guarantee stable ids yet, and a unique constraint would break
        // re-ingestion of retagged records. uri is the dedup key.
        let indexes = [
            IndexModel::builder().keys(doc! { "uri": 1 }).build(),
            IndexModel::builder().keys(doc! { "id": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "ber_data_source": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "entity_type": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "geojson": "2dsphere" })
                .build(),
        ];

        self.entities()
            .create_indexes(indexes)
            .await
            .change_context(EntityRepoError::Index)?;

        info!("indexes declared");
        Ok(())
    }

    async fn clean(&self) -> RepoResult<()> {
        let names = self
            .db
            .list_collection_names()
            .await
            .change_context(EntityRepoError::Drop)?;

        if names.iter().any(|name| name == ENTITIES_COLLECTION_NAME) {
            info!("dropping existing '{ENTITIES_COLLECTION_NAME}' collection");
            self.entities()
                .drop()
                .await
                .change_context(EntityRepoError::Drop)?;
        } else {
            info!("no existing '{ENTITIES_COLLECTION_NAME}' collection found");
        }

        Ok(())
    }
}

/// Pure allowlist projection: rebuilding the canonical model from a stored
/// document drops `_id`, `geojson`, `_metadata` and anything else outside
/// the entity field set. The document is consumed, never mutated in place.
fn to_entity(document: Document) -> RepoResult<Entity> {
    bson::from_document(document).change_context(EntityRepoError::Malformed)
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

/// Client filters arrive as JSON; conversion failures are the client's
/// problem, not the server's.
fn to_query_document(object: JsonObject) -> RepoResult<Document> {
    Document::try_from(object)
        .map_err(|e| Report::new(EntityRepoError::QueryRejected(e.to_string())))
}

/// Projections keep whatever the client named, but `_id` is store-internal
/// and has no stable JSON shape, so it is excluded unless asked for.
fn suppress_internal_id(mut projection: Document) -> Document {
    if !projection.contains_key("_id") {
        projection.insert("_id", 0);
    }
    projection
}

/// Extra filter keys are merged alongside the geospatial predicate; MongoDB
/// treats top-level keys as a conjunction, and `$near` is not permitted
/// inside `$and`.
fn merge_extra_filter(query: &mut Document, filter: Option<JsonObject>) -> RepoResult<()> {
    if let Some(extra) = filter {
        let extra = to_query_document(extra)?;
        for (key, value) in extra {
            if query.contains_key(&key) {
                warn!("extra filter key '{key}' collides with the geospatial predicate, overriding");
            }
            query.insert(key, value);
        }
    }
    Ok(())
}

/// Query-shape complaints from the server (unknown operators, bad geo
/// values) come back as command errors; those are client errors and carry
/// the server's message. Anything else keeps the caller's context.
fn rejection(err: mongodb::error::Error, context: EntityRepoError) -> Report<EntityRepoError> {
    match *err.kind {
        ErrorKind::Command(ref command_error) => Report::new(EntityRepoError::QueryRejected(
            command_error.message.clone(),
        )),
        _ => Report::new(context).attach(err.to_string()),
    }
}
