use axum::extract::FromRef;

use bertron_core::EntityRepository;

use crate::service::EntityService;

/// Version identifiers surfaced by `GET /version`. The server never loads
/// the ingest schema itself, so the schema version comes from the
/// environment (null when unset).
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub api: Option<String>,
    pub bertron_schema: Option<String>,
}

impl VersionInfo {
    pub fn from_env() -> Self {
        Self {
            api: Some(env!("CARGO_PKG_VERSION").to_string()),
            bertron_schema: std::env::var("BERTRON_SCHEMA_VERSION").ok(),
        }
    }
}

#[derive(Clone)]
pub struct BertronAppState<R: EntityRepository> {
    pub service: EntityService<R>,
    pub versions: VersionInfo,
}

impl<R: EntityRepository> BertronAppState<R> {
    pub fn new(service: EntityService<R>, versions: VersionInfo) -> Self {
        Self { service, versions }
    }
}

impl<R: EntityRepository> FromRef<BertronAppState<R>> for EntityService<R> {
    fn from_ref(input: &BertronAppState<R>) -> Self {
        input.service.clone()
    }
}

impl<R: EntityRepository> FromRef<BertronAppState<R>> for VersionInfo {
    fn from_ref(input: &BertronAppState<R>) -> Self {
        input.versions.clone()
    }
}
