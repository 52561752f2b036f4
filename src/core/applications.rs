// src/core/applications.rs
//! Application persistence: submissions plus the per-stage pipeline results

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::core::error::{StoreError, StoreResult};
use crate::core::job_postings::JobPostingRepository;
use crate::types::{
    AnalysisResult, Application, ApplicationFilter, ApplicationStats, ApplicationStatus,
    ApplicationWithJobPosting, CandidateData, DecisionResult, JobRequirements, NewApplication,
    ProcessingResult, ScheduledMeeting,
};
use crate::utils::is_valid_email;

pub struct ApplicationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ApplicationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new submission with status SUBMITTED
    pub async fn create(&self, new: &NewApplication) -> StoreResult<Application> {
        validate_new_application(new)?;

        let now = Utc::now();
        let file_names = serde_json::to_string(&new.file_names)?;
        let job_posting_id = Some(new.job_posting_id.trim()).filter(|id| !id.is_empty());

        let inserted = sqlx::query(
            r#"
            INSERT INTO applications (
                submission_id, candidate_name, candidate_email, candidate_description,
                file_names, status, submitted_at, job_posting_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.submission_id)
        .bind(new.candidate_name.trim())
        .bind(new.candidate_email.trim())
        .bind(&new.candidate_description)
        .bind(&file_names)
        .bind(ApplicationStatus::Submitted.as_str())
        .bind(now)
        .bind(job_posting_id)
        .execute(self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(StoreError::Duplicate(format!(
                    "Application with submission ID {}",
                    new.submission_id
                )));
            }
            Err(e) => {
                error!("Error creating application {}: {}", new.submission_id, e);
                return Err(e.into());
            }
        }

        info!("Saved application {} to database", new.submission_id);

        Ok(Application {
            submission_id: new.submission_id.clone(),
            candidate_name: new.candidate_name.trim().to_string(),
            candidate_email: new.candidate_email.trim().to_string(),
            candidate_description: new.candidate_description.clone(),
            file_names: new.file_names.clone(),
            status: ApplicationStatus::Submitted,
            submitted_at: now,
            processed_at: None,
            job_posting_id: job_posting_id.map(str::to_string),
            result: None,
        })
    }

    /// Set the status (stamping `processed_at`) and upsert the stage results when given.
    /// Runs in one transaction.
    pub async fn update_status(
        &self,
        submission_id: &str,
        status: ApplicationStatus,
        result: Option<&ProcessingResult>,
    ) -> StoreResult<()> {
        if submission_id.trim().is_empty() {
            return Err(StoreError::Invalid("Submission ID is required".to_string()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE applications SET status = ?, processed_at = ? WHERE submission_id = ?",
        )
        .bind(status.as_str())
        .bind(now)
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("Application {}", submission_id)));
        }

        if let Some(result) = result {
            store_processing_result(&mut tx, submission_id, result, now).await?;
        }

        tx.commit().await?;

        info!("Updated application {} status to {}", submission_id, status);
        Ok(())
    }

    pub async fn get(&self, submission_id: &str) -> StoreResult<Option<Application>> {
        if submission_id.trim().is_empty() {
            return Err(StoreError::Invalid("Submission ID is required".to_string()));
        }

        let row = sqlx::query(&format!("{} WHERE a.submission_id = ?", SELECT_APPLICATION))
            .bind(submission_id)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(row_to_application).transpose()
    }

    /// Newest first, optionally filtered by status
    pub async fn list(&self, filter: &ApplicationFilter) -> StoreResult<Vec<Application>> {
        let mut sql = SELECT_APPLICATION.to_string();
        if filter.status.is_some() {
            sql.push_str(" WHERE a.status = ?");
        }
        sql.push_str(" ORDER BY a.submitted_at DESC, a.rowid DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }

        let rows = query
            .bind(filter.limit.unwrap_or(-1))
            .bind(filter.offset.unwrap_or(0).max(0))
            .fetch_all(self.pool)
            .await?;

        rows.iter().map(row_to_application).collect()
    }

    /// Every application together with the posting it was submitted for
    pub async fn list_with_job_postings(&self) -> StoreResult<Vec<ApplicationWithJobPosting>> {
        let applications = self.list(&ApplicationFilter::default()).await?;
        let postings = JobPostingRepository::new(self.pool);

        let mut cache = BTreeMap::new();
        let mut out = Vec::with_capacity(applications.len());

        for application in applications {
            let job_posting = match &application.job_posting_id {
                Some(id) => {
                    if !cache.contains_key(id) {
                        cache.insert(id.clone(), postings.get(id).await?);
                    }
                    cache.get(id).cloned().flatten()
                }
                None => None,
            };
            out.push(ApplicationWithJobPosting {
                application,
                job_posting,
            });
        }

        Ok(out)
    }

    pub async fn stats(&self) -> StoreResult<ApplicationStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let by_status: BTreeMap<String, i64> = rows.into_iter().collect();
        let total = by_status.values().sum();

        Ok(ApplicationStats { total, by_status })
    }
}

fn validate_new_application(new: &NewApplication) -> StoreResult<()> {
    if new.submission_id.trim().is_empty() {
        return Err(StoreError::Invalid("Submission ID is required".to_string()));
    }
    if new.candidate_name.trim().is_empty() {
        return Err(StoreError::Invalid("Candidate name is required".to_string()));
    }
    if new.candidate_email.trim().is_empty() {
        return Err(StoreError::Invalid("Candidate email is required".to_string()));
    }
    if !is_valid_email(new.candidate_email.trim()) {
        return Err(StoreError::Invalid(format!(
            "Invalid email format: {}",
            new.candidate_email
        )));
    }
    Ok(())
}

async fn store_processing_result(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    submission_id: &str,
    result: &ProcessingResult,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let candidate = &result.candidate_data;
    sqlx::query(
        r#"
        INSERT INTO candidate_profiles (submission_id, years_of_experience, education_level, data, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(submission_id) DO UPDATE SET
            years_of_experience = excluded.years_of_experience,
            education_level = excluded.education_level,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(submission_id)
    .bind(candidate.years_of_experience)
    .bind(&candidate.education_level)
    .bind(serde_json::to_string(candidate)?)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let analysis = &result.analysis_result;
    sqlx::query(
        r#"
        INSERT INTO analysis_results (
            submission_id, technical_skills_score, experience_score, education_score,
            overall_fit, data, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(submission_id) DO UPDATE SET
            technical_skills_score = excluded.technical_skills_score,
            experience_score = excluded.experience_score,
            education_score = excluded.education_score,
            overall_fit = excluded.overall_fit,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(submission_id)
    .bind(analysis.technical_skills_score)
    .bind(analysis.experience_score)
    .bind(analysis.education_score)
    .bind(analysis.overall_fit)
    .bind(serde_json::to_string(analysis)?)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let decision = &result.decision_result;
    let meeting = result
        .scheduled_meeting
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    sqlx::query(
        r#"
        INSERT INTO decision_results (
            submission_id, recommendation, confidence, data, job_requirements,
            scheduled_meeting, processed_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(submission_id) DO UPDATE SET
            recommendation = excluded.recommendation,
            confidence = excluded.confidence,
            data = excluded.data,
            job_requirements = excluded.job_requirements,
            scheduled_meeting = excluded.scheduled_meeting,
            processed_at = excluded.processed_at
        "#,
    )
    .bind(submission_id)
    .bind(decision.recommendation.as_str())
    .bind(decision.confidence)
    .bind(serde_json::to_string(decision)?)
    .bind(serde_json::to_string(&result.job_requirements)?)
    .bind(meeting)
    .bind(result.processed_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// ===== Row mapping =====

const SELECT_APPLICATION: &str = r#"
    SELECT a.submission_id, a.candidate_name, a.candidate_email, a.candidate_description,
           a.file_names, a.status, a.submitted_at, a.processed_at, a.job_posting_id,
           cp.data AS candidate_data,
           ar.data AS analysis_data,
           dr.data AS decision_data,
           dr.job_requirements AS job_requirements,
           dr.scheduled_meeting AS scheduled_meeting,
           dr.processed_at AS result_processed_at
    FROM applications a
    LEFT JOIN candidate_profiles cp ON cp.submission_id = a.submission_id
    LEFT JOIN analysis_results ar ON ar.submission_id = a.submission_id
    LEFT JOIN decision_results dr ON dr.submission_id = a.submission_id
"#;

fn row_to_application(row: &SqliteRow) -> StoreResult<Application> {
    let submission_id: String = row.try_get("submission_id")?;
    let status_raw: String = row.try_get("status")?;
    let status = status_raw
        .parse::<ApplicationStatus>()
        .map_err(|e| StoreError::Corrupt(format!("{} ({})", e, submission_id)))?;
    let file_names: String = row.try_get("file_names")?;

    Ok(Application {
        file_names: serde_json::from_str(&file_names)?,
        candidate_name: row.try_get("candidate_name")?,
        candidate_email: row.try_get("candidate_email")?,
        candidate_description: row.try_get("candidate_description")?,
        status,
        submitted_at: row.try_get("submitted_at")?,
        processed_at: row.try_get("processed_at")?,
        job_posting_id: row.try_get("job_posting_id")?,
        result: row_to_result(row)?,
        submission_id,
    })
}

/// The stored result exists only once the decision row has been written
fn row_to_result(row: &SqliteRow) -> StoreResult<Option<ProcessingResult>> {
    let Some(decision_data) = row.try_get::<Option<String>, _>("decision_data")? else {
        return Ok(None);
    };

    let candidate_data: Option<String> = row.try_get("candidate_data")?;
    let analysis_data: Option<String> = row.try_get("analysis_data")?;
    let job_requirements: Option<String> = row.try_get("job_requirements")?;
    let scheduled_meeting: Option<String> = row.try_get("scheduled_meeting")?;

    Ok(Some(ProcessingResult {
        candidate_data: parse_or_default::<CandidateData>(candidate_data)?,
        analysis_result: parse_or_default::<AnalysisResult>(analysis_data)?,
        decision_result: serde_json::from_str::<DecisionResult>(&decision_data)?,
        job_requirements: parse_or_default::<JobRequirements>(job_requirements)?,
        processed_at: row.try_get("result_processed_at")?,
        scheduled_meeting: scheduled_meeting
            .map(|raw| serde_json::from_str::<ScheduledMeeting>(&raw))
            .transpose()?,
    }))
}

fn parse_or_default<T>(raw: Option<String>) -> StoreResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match raw {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::types::{JobPostingInput, Recommendation};

    fn new_application(id: &str) -> NewApplication {
        NewApplication {
            submission_id: id.to_string(),
            candidate_name: "Jane Doe".to_string(),
            candidate_email: "jane@example.com".to_string(),
            candidate_description: "Backend developer".to_string(),
            file_names: vec!["cv.pdf".to_string()],
            job_posting_id: String::new(),
        }
    }

    fn sample_result() -> ProcessingResult {
        ProcessingResult {
            candidate_data: CandidateData {
                years_of_experience: 6.0,
                technical_skills: vec!["Rust".to_string()],
                education_level: "MSc".to_string(),
                previous_roles: vec!["Engineer".to_string()],
                red_flags: vec![],
            },
            analysis_result: AnalysisResult {
                technical_skills_score: 9.0,
                experience_score: 8.0,
                education_score: 7.0,
                overall_fit: 8.5,
                concerns: vec![],
                strengths: vec!["Systems".to_string()],
            },
            decision_result: DecisionResult {
                recommendation: Recommendation::Hire,
                confidence: 8.0,
                reasoning: vec!["Strong fit".to_string()],
                next_steps: vec!["Interview".to_string()],
            },
            job_requirements: JobRequirements::default(),
            processed_at: Utc::now(),
            scheduled_meeting: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_application() {
        let db = Database::in_memory().await.unwrap();
        let repo = ApplicationRepository::new(db.pool());

        let created = repo.create(&new_application("sub-1")).await.unwrap();
        assert_eq!(created.status, ApplicationStatus::Submitted);

        let loaded = repo.get("sub-1").await.unwrap().unwrap();
        assert_eq!(loaded.candidate_name, "Jane Doe");
        assert_eq!(loaded.file_names, vec!["cv.pdf"]);
        assert!(loaded.processed_at.is_none());
        assert!(loaded.result.is_none());
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_invalid_email() {
        let db = Database::in_memory().await.unwrap();
        let repo = ApplicationRepository::new(db.pool());

        repo.create(&new_application("sub-1")).await.unwrap();
        let duplicate = repo.create(&new_application("sub-1")).await.unwrap_err();
        assert!(matches!(duplicate, StoreError::Duplicate(_)));
        assert!(duplicate.to_string().contains("already exists"));

        let mut bad = new_application("sub-2");
        bad.candidate_email = "not-an-email".to_string();
        assert!(matches!(
            repo.create(&bad).await.unwrap_err(),
            StoreError::Invalid(_)
        ));

        let mut nameless = new_application("sub-3");
        nameless.candidate_name = "  ".to_string();
        assert!(matches!(
            repo.create(&nameless).await.unwrap_err(),
            StoreError::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn test_update_status_stores_results_and_upserts() {
        let db = Database::in_memory().await.unwrap();
        let repo = ApplicationRepository::new(db.pool());
        repo.create(&new_application("sub-1")).await.unwrap();

        repo.update_status("sub-1", ApplicationStatus::Processing, None)
            .await
            .unwrap();
        let processing = repo.get("sub-1").await.unwrap().unwrap();
        assert_eq!(processing.status, ApplicationStatus::Processing);
        assert!(processing.processed_at.is_some());

        let mut result = sample_result();
        repo.update_status("sub-1", ApplicationStatus::SentToHr, Some(&result))
            .await
            .unwrap();

        result.decision_result.confidence = 9.0;
        repo.update_status("sub-1", ApplicationStatus::SentToHr, Some(&result))
            .await
            .unwrap();

        let loaded = repo.get("sub-1").await.unwrap().unwrap();
        let stored = loaded.result.unwrap();
        assert_eq!(stored.decision_result.confidence, 9.0);
        assert_eq!(stored.candidate_data.technical_skills, vec!["Rust"]);
        assert_eq!(stored.analysis_result.strengths, vec!["Systems"]);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM decision_results")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_update_status_unknown_submission_is_not_found() {
        let db = Database::in_memory().await.unwrap();
        let repo = ApplicationRepository::new(db.pool());

        let err = repo
            .update_status("ghost", ApplicationStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_and_stats() {
        let db = Database::in_memory().await.unwrap();
        let repo = ApplicationRepository::new(db.pool());

        for id in ["a", "b", "c"] {
            repo.create(&new_application(id)).await.unwrap();
        }
        repo.update_status("b", ApplicationStatus::AutoRejected, None)
            .await
            .unwrap();

        let all = repo.list(&ApplicationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].submission_id, "c");

        let rejected = repo
            .list(&ApplicationFilter {
                status: Some(ApplicationStatus::AutoRejected),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].submission_id, "b");

        let page = repo
            .list(&ApplicationFilter {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.get("SUBMITTED"), Some(&2));
        assert_eq!(stats.by_status.get("AUTO_REJECTED"), Some(&1));
    }

    #[tokio::test]
    async fn test_list_with_job_postings_joins_posting() {
        let db = Database::in_memory().await.unwrap();
        let postings = JobPostingRepository::new(db.pool());
        let posting = postings
            .create_from_form(
                &JobPostingInput {
                    title: "Rust Engineer".to_string(),
                    description: "Build services".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let repo = ApplicationRepository::new(db.pool());
        let mut application = new_application("sub-1");
        application.job_posting_id = posting.id.clone();
        repo.create(&application).await.unwrap();
        repo.create(&new_application("sub-2")).await.unwrap();

        let listed = repo.list_with_job_postings().await.unwrap();
        assert_eq!(listed.len(), 2);
        let with_posting = listed
            .iter()
            .find(|a| a.application.submission_id == "sub-1")
            .unwrap();
        assert_eq!(
            with_posting.job_posting.as_ref().map(|p| p.title.as_str()),
            Some("Rust Engineer")
        );
    }
}
