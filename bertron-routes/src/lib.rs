use error_stack::Report;

use crate::error::QueryServiceError;

pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub type ServiceResult<T> = Result<T, Report<QueryServiceError>>;
pub type OptServiceResult<T> = Result<Option<T>, Report<QueryServiceError>>;
