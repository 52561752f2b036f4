// src/web/handlers/job_posting_handlers.rs
use chrono::Utc;
use reqwest::Url;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

use super::store_error;
use crate::agents::AgentError;
use crate::core::{JobPostingFilter, JobPostingRepository};
use crate::tools::ScrapeError;
use crate::types::{ExtractionMethod, JobPosting, JobPostingInput, JobStatus};
use crate::web::types::*;

pub async fn list_job_postings_handler(
    state: &State<AppState>,
    status: Option<String>,
    method: Option<String>,
) -> ApiResult<DataResponse<Vec<JobPosting>>> {
    let status = match status.as_deref().map(str::parse::<JobStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => {
            return Err(api_error(
                Status::BadRequest,
                e,
                "INVALID_STATUS",
                &["Use one of DRAFT, ACTIVE, PAUSED, CLOSED"],
            ))
        }
    };

    let extraction_method = match method.as_deref().map(str::parse::<ExtractionMethod>) {
        None => None,
        Some(Ok(method)) => Some(method),
        Some(Err(e)) => {
            return Err(api_error(
                Status::BadRequest,
                e,
                "INVALID_EXTRACTION_METHOD",
                &["Use one of AI_EXTRACTED, MANUAL"],
            ))
        }
    };

    let filter = JobPostingFilter {
        status,
        extraction_method,
        ..JobPostingFilter::default()
    };
    let postings = JobPostingRepository::new(state.db.pool())
        .list(&filter)
        .await
        .map_err(|e| store_error(e, "Failed to fetch job posts"))?;

    let message = format!("Found {} job posts", postings.len());
    Ok(DataResponse::success(message, postings))
}

pub async fn get_job_posting_handler(
    state: &State<AppState>,
    id: &str,
) -> ApiResult<DataResponse<JobPosting>> {
    let posting = JobPostingRepository::new(state.db.pool())
        .get(id)
        .await
        .map_err(|e| store_error(e, "Failed to fetch job post"))?;

    match posting {
        Some(posting) => Ok(DataResponse::success("Job post found", posting)),
        None => Err(api_error(
            Status::NotFound,
            format!("Job post {} not found", id),
            "NOT_FOUND",
            &["Check the job post ID", "List job posts with GET /api/job-posts"],
        )),
    }
}

pub async fn update_job_posting_status_handler(
    state: &State<AppState>,
    id: &str,
    request: Json<StatusUpdateRequest>,
) -> ApiResult<DataResponse<JobPosting>> {
    let status: JobStatus = request.status.parse().map_err(|e: String| {
        api_error(
            Status::BadRequest,
            e,
            "INVALID_STATUS",
            &["Use one of DRAFT, ACTIVE, PAUSED, CLOSED"],
        )
    })?;

    let posting = JobPostingRepository::new(state.db.pool())
        .update_status(id, status)
        .await
        .map_err(|e| store_error(e, "Failed to update job post status"))?;

    info!("Job post {} is now {}", id, status);
    Ok(DataResponse::success(
        format!("Job post status updated to {}", status),
        posting,
    ))
}

pub async fn create_job_posting_handler(
    state: &State<AppState>,
    request: Json<JobPostingInput>,
) -> ApiResult<DataResponse<JobPosting>> {
    let form = request.into_inner();
    if form.title.trim().is_empty() || form.description.trim().is_empty() {
        return Err(api_error(
            Status::BadRequest,
            "Title and description are required",
            "MISSING_FIELDS",
            &["Provide a job title", "Provide a job description"],
        ));
    }

    let posting = JobPostingRepository::new(state.db.pool())
        .create_from_form(&form, None)
        .await
        .map_err(|e| store_error(e, "Failed to create job posting"))?;

    Ok(DataResponse::success("Job posting created successfully", posting))
}

pub async fn extract_job_handler(
    state: &State<AppState>,
    request: Json<JobExtractRequest>,
) -> ApiResult<JobExtractResponse> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(api_error(
            Status::BadRequest,
            "URL is required",
            "MISSING_URL",
            &["Provide the URL of a job posting page"],
        ));
    }
    if !is_http_url(url) {
        return Err(api_error(
            Status::BadRequest,
            "Invalid URL format",
            "INVALID_URL",
            &["Use a full http:// or https:// URL"],
        ));
    }

    let Some(agent) = state.job_extractor.as_ref() else {
        return Err(api_error(
            Status::InternalServerError,
            "Job extraction is not configured",
            "LLM_NOT_CONFIGURED",
            &["Set OPENAI_API_KEY and restart the server"],
        ));
    };

    info!("Extracting job posting from {}", url);
    let data = agent.execute(url).await.map_err(extraction_error)?;

    let job_post_id = if request.save {
        let posting = JobPostingRepository::new(state.db.pool())
            .create_from_extraction(&data, url, None)
            .await
            .map_err(|e| store_error(e, "Failed to save extracted job posting"))?;
        Some(posting.id)
    } else {
        None
    };

    Ok(Json(JobExtractResponse {
        success: true,
        data,
        extracted_at: Utc::now(),
        job_post_id,
    }))
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

fn extraction_error(err: AgentError) -> ApiError {
    match &err {
        AgentError::Scrape(ScrapeError::Timeout) => {
            warn!("Job extraction timed out: {}", err);
            api_error(
                Status::RequestTimeout,
                "Request timeout - the website took too long to respond",
                "TIMEOUT",
                &["Try again later", "Paste the job description manually"],
            )
        }
        AgentError::Scrape(_) => {
            warn!("Job extraction could not read the page: {}", err);
            api_error(
                Status::UnprocessableEntity,
                "Unable to access the provided URL. Please check if the URL is correct and publicly accessible.",
                "SCRAPE_FAILED",
                &["Check that the page is public", "Paste the job description manually"],
            )
        }
        AgentError::Llm(llm) if llm.is_timeout() => api_error(
            Status::RequestTimeout,
            "Request timeout - the extraction took too long",
            "TIMEOUT",
            &["Try again later"],
        ),
        AgentError::Llm(llm) if llm.is_rate_limited() => api_error(
            Status::TooManyRequests,
            "Rate limit exceeded. Please try again in a few minutes.",
            "RATE_LIMITED",
            &["Wait a few minutes before retrying"],
        ),
        AgentError::Llm(_) => {
            error!("Job extraction failed: {}", err);
            api_error(
                Status::InternalServerError,
                "Failed to extract job information",
                "EXTRACTION_FAILED",
                &["Try again in a few moments", "Contact support if the problem persists"],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://jobs.example.com/42"));
        assert!(is_http_url("http://localhost:8080/job"));
        assert!(!is_http_url("ftp://example.com/job"));
        assert!(!is_http_url("not a url"));
    }

    #[test]
    fn test_extraction_error_statuses() {
        let status = |err| extraction_error(err).0;
        assert_eq!(status(AgentError::Scrape(ScrapeError::Timeout)), Status::RequestTimeout);
        assert_eq!(
            status(AgentError::Scrape(ScrapeError::Status {
                status: 403,
                reason: "Forbidden".to_string()
            })),
            Status::UnprocessableEntity
        );
        assert_eq!(
            status(AgentError::Llm(LlmError::ApiError {
                status: 429,
                body: String::new()
            })),
            Status::TooManyRequests
        );
        assert_eq!(
            status(AgentError::Llm(LlmError::ParseError("x".to_string()))),
            Status::InternalServerError
        );
    }
}
