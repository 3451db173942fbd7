use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use error_stack::Report;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{error, warn};
use utoipa::ToSchema;

use bertron_core::result::EntityRepoError;

#[derive(Debug, thiserror::Error)]
#[error("entity query failed")]
pub struct QueryServiceError;

pub type ErrorMessageType = Cow<'static, str>;

/// Every error response carries a machine-distinguishable status and a
/// human-readable `detail` string. Store-layer failures are translated
/// here; no raw exception text reaches the client beyond the underlying
/// message we deliberately echo for diagnosability.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[serde(skip)]
    status_code: StatusCode,
    #[schema(value_type = String)]
    detail: ErrorMessageType,
}

impl ApiError {
    pub fn not_found(detail: impl Into<ErrorMessageType>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<ErrorMessageType>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable_entity(detail: impl Into<ErrorMessageType>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(detail: impl Into<ErrorMessageType>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    fn new(status_code: StatusCode, detail: impl Into<ErrorMessageType>) -> Self {
        Self {
            status_code,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

impl From<Report<QueryServiceError>> for ApiError {
    fn from(report: Report<QueryServiceError>) -> Self {
        match report.downcast_ref::<EntityRepoError>() {
            Some(EntityRepoError::CollectionMissing) => {
                warn!("query against a collection that does not exist");
                ApiError::not_found("Entities collection not found; has data been ingested?")
            }
            Some(EntityRepoError::QueryRejected(message)) => {
                warn!("database rejected a client query: {message}");
                ApiError::bad_request(format!("Query error: {message}"))
            }
            Some(EntityRepoError::Malformed) => {
                error!("stored document failed entity reconstruction: {report:?}");
                ApiError::internal("a stored document does not satisfy the entity model")
            }
            Some(other) => {
                error!("query failed: {report:?}");
                // echo the driver's message when one was attached; never a
                // stack trace
                let detail = report
                    .downcast_ref::<String>()
                    .map(|message| format!("Query error: {message}"))
                    .unwrap_or_else(|| format!("Query error: {other}"));
                ApiError::internal(detail)
            }
            None => {
                error!("query failed: {report:?}");
                ApiError::internal("query error")
            }
        }
    }
}
