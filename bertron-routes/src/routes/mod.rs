use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::instrument;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use bertron_core::geo::{BoundingBox, GeoPoint};
use bertron_core::model::Entity;
use bertron_core::query::{FindCriteria, MAX_FIND_LIMIT};
use bertron_core::{EntityRepository, JsonObject};

use crate::error::ApiError;
use crate::service::EntityService;
use crate::state::{BertronAppState, VersionInfo};

mod requests;
mod responses;

pub use requests::{BboxParams, FindRequest, NearbyParams};
pub use responses::{EntitiesResponse, FindDocuments, FindResponse, HealthResponse, VersionResponse};

const HEALTH_PATH: &str = "/health";
const VERSION_PATH: &str = "/version";
const BERTRON_ROOT_PATH: &str = "/bertron";

const ENTITY_LIST_PATH: &str = "/";
const ENTITY_FIND_PATH: &str = "/find";
const GEO_NEARBY_PATH: &str = "/geo/nearby";
const GEO_BBOX_PATH: &str = "/geo/bbox";
const ENTITY_GET_PATH: &str = "/{*entity_id}";

#[derive(OpenApi)]
#[openapi(
    paths(health, version),
    nest(
        (path = BERTRON_ROOT_PATH, api = BertronDocs),
    )
)]
struct ApiDoc;

#[derive(OpenApi)]
#[openapi(paths(
    get_all_entities,
    find_entities,
    geo_nearby,
    geo_bbox,
    get_entity_by_id,
))]
struct BertronDocs;

pub fn build<R: EntityRepository>(app_state: BertronAppState<R>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes(app_state))
        .split_for_parts();

    router
        .route("/", get(root))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api))
}

fn routes<S, R: EntityRepository>(app_state: BertronAppState<R>) -> OpenApiRouter<S> {
    OpenApiRouter::new()
        .route(HEALTH_PATH, get(health))
        .route(VERSION_PATH, get(version))
        .nest(
            BERTRON_ROOT_PATH,
            OpenApiRouter::new()
                .route(ENTITY_LIST_PATH, get(get_all_entities))
                .route(ENTITY_FIND_PATH, post(find_entities))
                .route(GEO_NEARBY_PATH, get(geo_nearby))
                .route(GEO_BBOX_PATH, get(geo_bbox))
                .route(ENTITY_GET_PATH, get(get_entity_by_id)),
        )
        .with_state(app_state)
}

async fn root() -> Redirect {
    Redirect::temporary("/docs")
}

/// Report whether the web server and its database are reachable.
#[utoipa::path(
    get,
    path = HEALTH_PATH,
    responses(
        (status = OK, description = "System health information", body = HealthResponse),
    ),
)]
#[instrument(skip(service))]
async fn health<R>(State(service): State<EntityService<R>>) -> Json<HealthResponse>
where
    R: EntityRepository,
{
    Json(HealthResponse {
        web_server: true,
        database: service.ping().await,
    })
}

/// Report the version identifiers of the API and the entity schema.
#[utoipa::path(
    get,
    path = VERSION_PATH,
    responses(
        (status = OK, description = "System version information", body = VersionResponse),
    ),
)]
async fn version(State(versions): State<VersionInfo>) -> Json<VersionResponse> {
    Json(VersionResponse {
        api: versions.api,
        bertron_schema: versions.bertron_schema,
    })
}

/// Every entity in the collection, reconstructed as canonical entities.
#[utoipa::path(
    get,
    path = ENTITY_LIST_PATH,
    responses(
        (status = OK, description = "All stored entities", body = EntitiesResponse),
        (status = NOT_FOUND, description = "The entity collection does not exist yet", body = ApiError),
    ),
)]
#[instrument(skip(service), err(Debug))]
async fn get_all_entities<R>(
    State(service): State<EntityService<R>>,
) -> Result<Json<EntitiesResponse>, ApiError>
where
    R: EntityRepository,
{
    let entities = service.get_all().await?;
    Ok(Json(EntitiesResponse::new(entities)))
}

/// Look one entity up by its logical id. Ids may contain slashes (DOIs),
/// so the whole remaining path is the id.
#[utoipa::path(
    get,
    path = "/{entity_id}",
    responses(
        (status = OK, description = "The entity with the given id", body = Entity),
        (status = NOT_FOUND, description = "No entity has the given id", body = ApiError),
    ),
    params(
        ("entity_id" = String, Path, description = "The logical entity id, e.g. EMSL:<uuid> or doi:<doi>"),
    ),
)]
#[instrument(skip(service), err(Debug))]
async fn get_entity_by_id<R>(
    State(service): State<EntityService<R>>,
    Path(entity_id): Path<String>,
) -> Result<Json<Entity>, ApiError>
where
    R: EntityRepository,
{
    match service.get_by_id(&entity_id).await? {
        Some(entity) => Ok(Json(entity)),
        None => Err(ApiError::not_found(format!(
            "Entity with ID '{entity_id}' not found"
        ))),
    }
}

/// Query entities with a native filter. With a projection the documents
/// come back exactly as projected; without one they are full canonical
/// entities.
#[utoipa::path(
    post,
    path = ENTITY_FIND_PATH,
    responses(
        (status = OK, description = "Matching documents", body = FindResponse),
        (status = BAD_REQUEST, description = "The database rejected the filter", body = ApiError),
        (status = NOT_FOUND, description = "The entity collection does not exist yet", body = ApiError),
        (status = UNPROCESSABLE_ENTITY, description = "skip or limit out of range", body = ApiError),
    ),
    request_body = FindRequest,
)]
#[instrument(skip(service, request), err(Debug), fields(req.skip = request.skip, req.limit = request.limit))]
async fn find_entities<R>(
    State(service): State<EntityService<R>>,
    Json(request): Json<FindRequest>,
) -> Result<Json<FindResponse>, ApiError>
where
    R: EntityRepository,
{
    if !(1..=MAX_FIND_LIMIT).contains(&request.limit) {
        return Err(ApiError::unprocessable_entity(format!(
            "limit must be between 1 and {MAX_FIND_LIMIT}"
        )));
    }

    let criteria = FindCriteria {
        filter: request.filter,
        projection: request.projection,
        skip: request.skip,
        limit: request.limit,
        sort: request.sort,
    };

    let outcome = service.find(criteria).await?;
    Ok(Json(FindResponse::from(outcome)))
}

/// Entities within a great-circle radius of a point.
#[utoipa::path(
    get,
    path = GEO_NEARBY_PATH,
    responses(
        (status = OK, description = "Entities within the radius", body = EntitiesResponse),
        (status = BAD_REQUEST, description = "Malformed filter_json", body = ApiError),
        (status = NOT_FOUND, description = "The entity collection does not exist yet", body = ApiError),
        (status = UNPROCESSABLE_ENTITY, description = "Coordinates or radius out of range", body = ApiError),
    ),
    params(
        ("latitude" = f64, Query, description = "Center latitude, -90 to 90"),
        ("longitude" = f64, Query, description = "Center longitude, -180 to 180"),
        ("radius_meters" = f64, Query, description = "Great-circle cutoff in meters, > 0"),
        ("filter_json" = Option<String>, Query, description = "Serialized filter object ANDed with the spatial predicate"),
    ),
)]
#[instrument(skip(service, params), err(Debug), fields(req.lat = params.latitude, req.lng = params.longitude))]
async fn geo_nearby<R>(
    State(service): State<EntityService<R>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<EntitiesResponse>, ApiError>
where
    R: EntityRepository,
{
    if !(-90.0..=90.0).contains(&params.latitude) {
        return Err(ApiError::unprocessable_entity(
            "latitude must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&params.longitude) {
        return Err(ApiError::unprocessable_entity(
            "longitude must be between -180 and 180",
        ));
    }
    if params.radius_meters <= 0.0 {
        return Err(ApiError::unprocessable_entity(
            "radius_meters must be greater than 0",
        ));
    }

    let filter = parse_filter_json(params.filter_json.as_deref())?;
    let center = GeoPoint::new(params.latitude, params.longitude);

    let entities = service
        .find_nearby(center, params.radius_meters, filter)
        .await?;
    Ok(Json(EntitiesResponse::new(entities)))
}

/// Entities inside a southwest/northeast bounding box. Boxes wrapping the
/// antimeridian or poles are rejected.
#[utoipa::path(
    get,
    path = GEO_BBOX_PATH,
    responses(
        (status = OK, description = "Entities inside the box", body = EntitiesResponse),
        (status = BAD_REQUEST, description = "Inverted box corners or malformed filter_json", body = ApiError),
        (status = NOT_FOUND, description = "The entity collection does not exist yet", body = ApiError),
    ),
    params(
        ("southwest_lat" = f64, Query, description = "Southwest corner latitude"),
        ("southwest_lng" = f64, Query, description = "Southwest corner longitude"),
        ("northeast_lat" = f64, Query, description = "Northeast corner latitude"),
        ("northeast_lng" = f64, Query, description = "Northeast corner longitude"),
        ("filter_json" = Option<String>, Query, description = "Serialized filter object ANDed with the spatial predicate"),
    ),
)]
#[instrument(skip(service, params), err(Debug))]
async fn geo_bbox<R>(
    State(service): State<EntityService<R>>,
    Query(params): Query<BboxParams>,
) -> Result<Json<EntitiesResponse>, ApiError>
where
    R: EntityRepository,
{
    let bounds = BoundingBox::new(
        GeoPoint::new(params.southwest_lat, params.southwest_lng),
        GeoPoint::new(params.northeast_lat, params.northeast_lng),
    )
    .map_err(|report| ApiError::bad_request(report.current_context().to_string()))?;

    let filter = parse_filter_json(params.filter_json.as_deref())?;

    let entities = service.find_in_bbox(bounds, filter).await?;
    Ok(Json(EntitiesResponse::new(entities)))
}

fn parse_filter_json(filter_json: Option<&str>) -> Result<Option<JsonObject>, ApiError> {
    match filter_json {
        None => Ok(None),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(ApiError::bad_request(
                "Invalid filter JSON: expected an object",
            )),
            Err(e) => Err(ApiError::bad_request(format!("Invalid filter JSON: {e}"))),
        },
    }
}
