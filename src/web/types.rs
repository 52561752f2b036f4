// src/web/types.rs
use chrono::{DateTime, Utc};
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::agents::JobExtractionAgent;
use crate::core::Database;
use crate::queue::{JobQueue, QueueCounts};
use crate::types::{
    ApplicationStats, ApplicationStatus, JobPostingInput, JobPostingStats,
};

/// Shared state handed to every route
pub struct AppState {
    pub db: Database,
    pub queue: JobQueue,
    /// Absent when no LLM key is configured
    pub job_extractor: Option<Arc<JobExtractionAgent>>,
    pub upload_root: PathBuf,
    pub submit_delay_ms: i64,
    pub submit_priority: i64,
    pub max_upload_bytes: u64,
}

// ===== Responses =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> DataResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

pub type ApiError = (Status, Json<StandardErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(status: Status, error: impl Into<String>, code: &str, suggestions: &[&str]) -> ApiError {
    (
        status,
        Json(StandardErrorResponse::new(
            error.into(),
            code.to_string(),
            suggestions.iter().map(|s| s.to_string()).collect(),
        )),
    )
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct JobExtractResponse {
    pub success: bool,
    pub data: JobPostingInput,
    pub extracted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_post_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub submission_id: String,
    pub status: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StatusResponse {
    pub submission_id: String,
    pub candidate_name: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StatsResponse {
    pub applications: ApplicationStats,
    pub job_postings: JobPostingStats,
    pub queue: QueueCounts,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

// ===== Requests =====

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct JobExtractRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub save: bool,
}

/// Candidate submission. Text fields are optional here so that missing ones
/// produce a 400 with a helpful message instead of a form error.
#[derive(FromForm)]
pub struct UploadForm<'f> {
    pub name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    #[field(name = "jobPostId")]
    pub job_post_id: Option<String>,
    pub files: Vec<TempFile<'f>>,
}
