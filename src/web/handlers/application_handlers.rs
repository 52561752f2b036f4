// src/web/handlers/application_handlers.rs
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store_error;
use crate::core::{ApplicationRepository, FsOps, JobPostingRepository};
use crate::queue::{ApplicationJob, EnqueueOptions, JobKind};
use crate::types::{ApplicationWithJobPosting, NewApplication};
use crate::utils::{is_valid_email, sanitize_file_name};
use crate::web::types::*;

fn form_value(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn upload_application_handler(
    state: &State<AppState>,
    mut upload: Form<UploadForm<'_>>,
) -> ApiResult<UploadResponse> {
    let (Some(name), Some(email)) = (form_value(&upload.name), form_value(&upload.email)) else {
        return Err(api_error(
            Status::BadRequest,
            "Name and email are required",
            "MISSING_FIELDS",
            &["Fill in your name", "Fill in your email address"],
        ));
    };
    let (name, email) = (name.to_string(), email.to_string());

    if !is_valid_email(&email) {
        return Err(api_error(
            Status::BadRequest,
            "Invalid email format",
            "INVALID_EMAIL",
            &["Use an address like name@example.com"],
        ));
    }

    if upload.files.is_empty() {
        return Err(api_error(
            Status::BadRequest,
            "At least one file is required",
            "MISSING_FILES",
            &["Attach your CV", "Supported formats: PDF, DOC, DOCX, RTF, ODT, TXT"],
        ));
    }

    if let Some(file) = upload.files.iter().find(|f| f.len() > state.max_upload_bytes) {
        let name = file
            .raw_name()
            .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string())
            .unwrap_or_default();
        return Err(api_error(
            Status::PayloadTooLarge,
            format!("File {} is too large", name),
            "FILE_TOO_LARGE",
            &["Compress the file or upload a smaller version"],
        ));
    }

    let job_post_id = form_value(&upload.job_post_id).map(str::to_string);
    let Some(job_post_id) = job_post_id else {
        return Err(api_error(
            Status::BadRequest,
            "Job post ID is required",
            "MISSING_JOB_POST",
            &["Apply through a job post page"],
        ));
    };

    let posting = JobPostingRepository::new(state.db.pool())
        .get(&job_post_id)
        .await
        .map_err(|e| store_error(e, "Failed to look up job post"))?;
    if posting.is_none() {
        return Err(api_error(
            Status::NotFound,
            format!("Job post {} not found", job_post_id),
            "JOB_POST_NOT_FOUND",
            &["The position may have been removed", "Check the job post link"],
        ));
    }

    let submission_id = Uuid::new_v4().to_string();
    let dir = FsOps::submission_dir(&state.upload_root, &submission_id);
    if let Err(e) = FsOps::ensure_dir_exists(&dir).await {
        error!("Failed to create upload directory {}: {}", dir.display(), e);
        return Err(api_error(
            Status::InternalServerError,
            "Failed to store uploaded files",
            "FILE_SAVE_ERROR",
            &["Try uploading the files again"],
        ));
    }

    let mut file_names = Vec::with_capacity(upload.files.len());
    for (index, file) in upload.files.iter_mut().enumerate() {
        let original = file
            .raw_name()
            .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string())
            .unwrap_or_else(|| format!("document-{}", index + 1));
        let path = FsOps::unique_file_path(&dir, &sanitize_file_name(&original));

        if let Err(e) = file.persist_to(&path).await {
            error!("Failed to save uploaded file {}: {}", original, e);
            cleanup(&dir).await;
            return Err(api_error(
                Status::InternalServerError,
                "Failed to store uploaded files",
                "FILE_SAVE_ERROR",
                &["Try uploading the files again"],
            ));
        }

        if let Some(stored) = path.file_name().and_then(|n| n.to_str()) {
            file_names.push(stored.to_string());
        }
    }

    let new_application = NewApplication {
        submission_id: submission_id.clone(),
        candidate_name: name.clone(),
        candidate_email: email.clone(),
        candidate_description: upload.description.clone().unwrap_or_default(),
        file_names: file_names.clone(),
        job_posting_id: job_post_id.clone(),
    };

    if let Err(e) = ApplicationRepository::new(state.db.pool())
        .create(&new_application)
        .await
    {
        cleanup(&dir).await;
        return Err(store_error(e, "Failed to save application"));
    }

    let job = ApplicationJob {
        submission_id: submission_id.clone(),
        candidate_name: name.clone(),
        candidate_email: email,
        candidate_description: new_application.candidate_description,
        job_posting_id: job_post_id,
        file_names,
    };
    let options = EnqueueOptions {
        delay_ms: state.submit_delay_ms,
        priority: state.submit_priority,
        ..EnqueueOptions::default()
    };
    if let Err(e) = state.queue.enqueue(JobKind::HrApplication, &job, options).await {
        error!("Failed to queue application {}: {}", submission_id, e);
        return Err(api_error(
            Status::InternalServerError,
            "Application saved but could not be queued for processing",
            "QUEUE_ERROR",
            &["Contact support with your submission ID"],
        ));
    }

    info!("Application {} from {} queued", submission_id, name);
    Ok(Json(UploadResponse {
        message: "Application submitted successfully".to_string(),
        submission_id,
        status: "submitted".to_string(),
    }))
}

async fn cleanup(dir: &std::path::Path) {
    if let Err(e) = FsOps::remove_dir_all(dir).await {
        warn!("Failed to clean up {}: {}", dir.display(), e);
    }
}

pub async fn application_status_handler(
    state: &State<AppState>,
    submission_id: &str,
) -> ApiResult<StatusResponse> {
    let application = ApplicationRepository::new(state.db.pool())
        .get(submission_id)
        .await
        .map_err(|e| store_error(e, "Failed to fetch application status"))?;

    match application {
        Some(app) => Ok(Json(StatusResponse {
            submission_id: app.submission_id,
            candidate_name: app.candidate_name,
            status: app.status,
            submitted_at: app.submitted_at,
            processed_at: app.processed_at,
        })),
        None => Err(api_error(
            Status::NotFound,
            "Application not found",
            "NOT_FOUND",
            &["Check the submission ID"],
        )),
    }
}

pub async fn my_applications_handler(
    state: &State<AppState>,
) -> ApiResult<DataResponse<Vec<ApplicationWithJobPosting>>> {
    let applications = ApplicationRepository::new(state.db.pool())
        .list_with_job_postings()
        .await
        .map_err(|e| store_error(e, "Failed to fetch applications"))?;

    let message = format!("Found {} applications", applications.len());
    Ok(DataResponse::success(message, applications))
}
