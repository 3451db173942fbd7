use error_stack::Report;

pub type RepoResult<T> = Result<T, Report<EntityRepoError>>;
pub type OptRepoResult<T> = Result<Option<T>, Report<EntityRepoError>>;

#[derive(Debug, thiserror::Error)]
pub enum EntityRepoError {
    #[error("the entity collection does not exist")]
    CollectionMissing,
    #[error("the database rejected the query: {0}")]
    QueryRejected(String),
    #[error("a stored document does not satisfy the entity model")]
    Malformed,
    #[error("failed to list entities")]
    List,
    #[error("failed to get entity")]
    Get,
    #[error("failed to run find query")]
    Find,
    #[error("failed to run geospatial query")]
    Geo,
    #[error("failed to upsert entity")]
    Upsert,
    #[error("failed to declare indexes")]
    Index,
    #[error("failed to drop the entity collection")]
    Drop,
}
