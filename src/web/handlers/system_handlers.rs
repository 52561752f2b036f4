// src/web/handlers/system_handlers.rs
use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use super::store_error;
use crate::core::{ApplicationRepository, JobPostingRepository};
use crate::web::types::*;

pub async fn stats_handler(state: &State<AppState>) -> ApiResult<DataResponse<StatsResponse>> {
    let applications = ApplicationRepository::new(state.db.pool())
        .stats()
        .await
        .map_err(|e| store_error(e, "Failed to fetch application statistics"))?;
    let job_postings = JobPostingRepository::new(state.db.pool())
        .stats()
        .await
        .map_err(|e| store_error(e, "Failed to fetch job post statistics"))?;
    let queue = state.queue.counts().await.map_err(|e| {
        error!("Failed to read queue counts: {}", e);
        api_error(
            Status::InternalServerError,
            "Failed to fetch queue statistics",
            "QUEUE_ERROR",
            &["Try again in a few moments"],
        )
    })?;

    Ok(DataResponse::success(
        "Statistics collected",
        StatsResponse {
            applications,
            job_postings,
            queue,
        },
    ))
}

pub async fn health_handler(state: &State<AppState>) -> Result<Json<HealthResponse>, (Status, Json<HealthResponse>)> {
    match state.db.health_check().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "ok".to_string(),
            database: "connected".to_string(),
            timestamp: Utc::now(),
        })),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            Err((
                Status::ServiceUnavailable,
                Json(HealthResponse {
                    status: "error".to_string(),
                    database: "unavailable".to_string(),
                    timestamp: Utc::now(),
                }),
            ))
        }
    }
}
