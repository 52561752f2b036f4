// src/web/handlers/mod.rs
pub mod application_handlers;
pub mod job_posting_handlers;
pub mod system_handlers;

pub use application_handlers::*;
pub use job_posting_handlers::*;
pub use system_handlers::*;

use rocket::http::Status;
use tracing::error;

use crate::core::StoreError;
use crate::web::types::{api_error, ApiError};

/// Repository failures as HTTP errors; `context` is the message for server-side faults
pub(crate) fn store_error(err: StoreError, context: &str) -> ApiError {
    match err {
        StoreError::Invalid(msg) => api_error(
            Status::BadRequest,
            msg,
            "VALIDATION_ERROR",
            &["Check the submitted fields"],
        ),
        StoreError::Duplicate(what) => api_error(
            Status::Conflict,
            format!("{} already exists", what),
            "DUPLICATE",
            &["This record was already submitted"],
        ),
        StoreError::NotFound(what) => api_error(
            Status::NotFound,
            format!("{} not found", what),
            "NOT_FOUND",
            &["Check the ID in the request"],
        ),
        other => {
            error!("{}: {}", context, other);
            api_error(
                Status::InternalServerError,
                context,
                "DATABASE_ERROR",
                &["Try again in a few moments", "Contact support if the problem persists"],
            )
        }
    }
}
