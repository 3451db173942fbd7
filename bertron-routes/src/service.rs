use error_stack::ResultExt;
use tracing::instrument;

use bertron_core::geo::{BoundingBox, GeoPoint};
use bertron_core::model::Entity;
use bertron_core::query::{FindCriteria, FindOutcome};
use bertron_core::{EntityRepository, JsonObject};

use crate::error::QueryServiceError;
use crate::{OptServiceResult, ServiceResult};

/// Read-only facade over the repository, constructed with the instance it
/// should query. Handlers never touch the store directly.
#[derive(Debug, Clone)]
pub struct EntityService<R> {
    repo: R,
}

impl<R: EntityRepository> EntityService<R> {
    pub fn new(repo: R) -> Self {
        EntityService { repo }
    }

    pub async fn ping(&self) -> bool {
        self.repo.ping().await
    }

    #[instrument(skip_all, name = "service#get_all")]
    pub async fn get_all(&self) -> ServiceResult<Vec<Entity>> {
        self.repo.get_all().await.change_context(QueryServiceError)
    }

    #[instrument(skip_all, name = "service#get_by_id")]
    pub async fn get_by_id(&self, id: &str) -> OptServiceResult<Entity> {
        self.repo
            .get_by_id(id)
            .await
            .change_context(QueryServiceError)
    }

    #[instrument(skip_all, name = "service#find")]
    pub async fn find(&self, criteria: FindCriteria) -> ServiceResult<FindOutcome> {
        self.repo
            .find(criteria)
            .await
            .change_context(QueryServiceError)
    }

    #[instrument(skip_all, name = "service#find_nearby")]
    pub async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        filter: Option<JsonObject>,
    ) -> ServiceResult<Vec<Entity>> {
        self.repo
            .find_nearby(center, radius_meters, filter)
            .await
            .change_context(QueryServiceError)
    }

    #[instrument(skip_all, name = "service#find_in_bbox")]
    pub async fn find_in_bbox(
        &self,
        bounds: BoundingBox,
        filter: Option<JsonObject>,
    ) -> ServiceResult<Vec<Entity>> {
        self.repo
            .find_in_bbox(bounds, filter)
            .await
            .change_context(QueryServiceError)
    }
}
