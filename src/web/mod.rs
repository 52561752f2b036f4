// src/web/mod.rs
//! HTTP API: job posts, candidate submissions, status and statistics

pub mod cors_utils;
pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::{Context, Result};
use rocket::data::{Limits, ToByteUnit};
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catchers, get, patch, post, routes, Build, Rocket, State};
use std::sync::Arc;
use tracing::info;

use crate::agents::JobExtractionAgent;
use crate::core::config_manager::ServerConfig;
use crate::core::{ConfigManager, Database};
use crate::queue::JobQueue;
use crate::types::{ApplicationWithJobPosting, JobPosting, JobPostingInput};
use cors_utils::{universal_options_handler, Cors};

impl AppState {
    pub fn new(
        config: &ConfigManager,
        db: Database,
        queue: JobQueue,
        job_extractor: Option<Arc<JobExtractionAgent>>,
    ) -> Self {
        Self {
            db,
            queue,
            job_extractor,
            upload_root: config.environment.upload_path.clone(),
            submit_delay_ms: config.pipeline.submit_delay_ms,
            submit_priority: config.pipeline.submit_priority,
            max_upload_bytes: config.server.max_upload_mb * 1024 * 1024,
        }
    }
}

// ===== Job posts =====

#[get("/job-posts?<status>&<method>")]
pub async fn list_job_posts(
    state: &State<AppState>,
    status: Option<String>,
    method: Option<String>,
) -> ApiResult<DataResponse<Vec<JobPosting>>> {
    handlers::list_job_postings_handler(state, status, method).await
}

#[get("/job-posts/<id>")]
pub async fn get_job_post(state: &State<AppState>, id: &str) -> ApiResult<DataResponse<JobPosting>> {
    handlers::get_job_posting_handler(state, id).await
}

#[patch("/job-posts/<id>/status", data = "<request>")]
pub async fn update_job_post_status(
    state: &State<AppState>,
    id: &str,
    request: Json<StatusUpdateRequest>,
) -> ApiResult<DataResponse<JobPosting>> {
    handlers::update_job_posting_status_handler(state, id, request).await
}

#[post("/job-posting", data = "<request>")]
pub async fn create_job_posting(
    state: &State<AppState>,
    request: Json<JobPostingInput>,
) -> ApiResult<DataResponse<JobPosting>> {
    handlers::create_job_posting_handler(state, request).await
}

#[post("/job-extract", data = "<request>")]
pub async fn extract_job(
    state: &State<AppState>,
    request: Json<JobExtractRequest>,
) -> ApiResult<JobExtractResponse> {
    handlers::extract_job_handler(state, request).await
}

// ===== Applications =====

#[post("/upload", data = "<upload>")]
pub async fn upload_application(
    state: &State<AppState>,
    upload: Form<UploadForm<'_>>,
) -> ApiResult<UploadResponse> {
    handlers::upload_application_handler(state, upload).await
}

#[get("/status/<submission_id>")]
pub async fn application_status(
    state: &State<AppState>,
    submission_id: &str,
) -> ApiResult<StatusResponse> {
    handlers::application_status_handler(state, submission_id).await
}

#[get("/my-applications")]
pub async fn my_applications(
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<ApplicationWithJobPosting>>> {
    handlers::my_applications_handler(state).await
}

// ===== System =====

#[get("/stats")]
pub async fn stats(state: &State<AppState>) -> ApiResult<DataResponse<StatsResponse>> {
    handlers::stats_handler(state).await
}

#[get("/health")]
pub async fn health(
    state: &State<AppState>,
) -> Result<Json<HealthResponse>, (Status, Json<HealthResponse>)> {
    handlers::health_handler(state).await
}

// ===== Catchers =====

#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(413)]
pub fn payload_too_large() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Upload exceeds the size limit".to_string(),
        "FILE_TOO_LARGE".to_string(),
        vec!["Upload smaller files".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be understood".to_string(),
        "INVALID_BODY".to_string(),
        vec!["Check field names and value types".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

pub fn build_rocket(state: AppState, server: &ServerConfig) -> Rocket<Build> {
    // A submission may carry several files, each up to the per-file limit
    let limits = Limits::default()
        .limit("json", 1.mebibytes())
        .limit("file", server.max_upload_mb.mebibytes())
        .limit("data-form", (server.max_upload_mb * 4).mebibytes());

    let figment = rocket::Config::figment()
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("limits", limits));

    rocket::custom(figment)
        .attach(Cors::new(server.allowed_origins.clone()))
        .manage(state)
        .register(
            "/api",
            catchers![bad_request, not_found, payload_too_large, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                list_job_posts,
                get_job_post,
                update_job_post_status,
                create_job_posting,
                extract_job,
                upload_application,
                application_status,
                my_applications,
                stats,
                health,
                universal_options_handler,
            ],
        )
}

pub async fn start_web_server(config: &ConfigManager, state: AppState) -> Result<()> {
    info!(
        "Starting hiring pipeline API on {}:{}",
        config.server.address, config.server.port
    );
    info!("Database: {}", config.environment.database_path.display());
    info!("Uploads: {}", config.environment.upload_path.display());

    build_rocket(state, &config.server)
        .launch()
        .await
        .context("Web server failed")?;

    Ok(())
}
