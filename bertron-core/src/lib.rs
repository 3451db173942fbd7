use crate::geo::{BoundingBox, GeoPoint};
use crate::model::Entity;
use crate::query::{FindCriteria, FindOutcome, NewEntityDocument, UpsertOutcome};
use crate::result::{OptRepoResult, RepoResult};

pub mod geo;
pub mod model;
pub mod query;
pub mod result;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Capability contract over the persistence backend. The ingestion pipeline
/// and the query service are both constructed with an implementation of this
/// trait, so tests can substitute an in-memory fake.
///
/// Upsert-by-`uri` is the only concurrent-mutation primitive relied upon;
/// the backend is expected to apply it atomically per document.
pub trait EntityRepository: Clone + Send + Sync + 'static {
    /// Reachability probe used by the health endpoint.
    fn ping(&self) -> impl Future<Output = bool> + Send;

    /// Every stored document, reconstructed as canonical entities.
    /// Fails with `CollectionMissing` when the collection was never created.
    fn get_all(&self) -> impl Future<Output = RepoResult<Vec<Entity>>> + Send;

    /// Exact match on the logical `id` field (not `uri`).
    fn get_by_id(&self, id: &str) -> impl Future<Output = OptRepoResult<Entity>> + Send;

    /// Arbitrary structured filter passed through to the store's native
    /// query language. The outcome shape depends on whether the criteria
    /// carry a projection.
    fn find(&self, criteria: FindCriteria) -> impl Future<Output = RepoResult<FindOutcome>> + Send;

    /// Spherical proximity query on the derived geo field. `radius_meters`
    /// is a strict great-circle cutoff. The extra filter is ANDed in.
    fn find_nearby(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        filter: Option<JsonObject>,
    ) -> impl Future<Output = RepoResult<Vec<Entity>>> + Send;

    /// Rectangular containment query. The box is validated at construction,
    /// so implementations may assume southwest < northeast on both axes.
    fn find_in_bbox(
        &self,
        bounds: BoundingBox,
        filter: Option<JsonObject>,
    ) -> impl Future<Output = RepoResult<Vec<Entity>>> + Send;

    /// Insert-if-absent / replace-if-present keyed on `uri`. Replaces all
    /// fields, never a partial merge.
    fn upsert(
        &self,
        document: NewEntityDocument,
    ) -> impl Future<Output = RepoResult<UpsertOutcome>> + Send;

    /// Idempotently declare the indexes the query surface depends on.
    fn ensure_indexes(&self) -> impl Future<Output = RepoResult<()>> + Send;

    /// Drop the entire entity collection. Pre-batch reset only.
    fn clean(&self) -> impl Future<Output = RepoResult<()>> + Send;
}
