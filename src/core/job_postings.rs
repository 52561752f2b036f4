// src/core/job_postings.rs
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::core::error::{StoreError, StoreResult};
use crate::types::{
    EmploymentType, ExtractionMethod, JobPosting, JobPostingInput, JobPostingStats, JobStatus,
    RoleLevel,
};

#[derive(Debug, Clone, Default)]
pub struct JobPostingFilter {
    pub status: Option<JobStatus>,
    pub extraction_method: Option<ExtractionMethod>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct JobPostingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobPostingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Posting typed into the company form
    pub async fn create_from_form(
        &self,
        form: &JobPostingInput,
        created_by: Option<&str>,
    ) -> StoreResult<JobPosting> {
        if form.title.trim().is_empty() {
            return Err(StoreError::Invalid("Job title is required".to_string()));
        }
        if form.description.trim().is_empty() {
            return Err(StoreError::Invalid("Job description is required".to_string()));
        }

        let posting = self
            .insert(form, ExtractionMethod::Manual, None, created_by)
            .await?;
        info!("Created job posting from form: {}", posting.id);
        Ok(posting)
    }

    /// Posting produced by the job extraction agent
    pub async fn create_from_extraction(
        &self,
        data: &JobPostingInput,
        source_url: &str,
        created_by: Option<&str>,
    ) -> StoreResult<JobPosting> {
        let posting = self
            .insert(data, ExtractionMethod::AiExtracted, Some(source_url), created_by)
            .await?;
        info!(
            "Created job posting from extraction: {} ({})",
            posting.id, source_url
        );
        Ok(posting)
    }

    async fn insert(
        &self,
        input: &JobPostingInput,
        method: ExtractionMethod,
        source_url: Option<&str>,
        created_by: Option<&str>,
    ) -> StoreResult<JobPosting> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let extracted_at = source_url.map(|_| now);
        let currency = input
            .salary_currency
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "USD".to_string());

        sqlx::query(
            r#"
            INSERT INTO job_postings (
                id, title, department, location, employment_type, salary_min, salary_max,
                salary_currency, description, requirements, benefits, remote_allowed, status,
                minimum_experience, preferred_education, role_level, required_skills,
                preferred_skills, company_name, source_url, extracted_at, extraction_method,
                created_at, updated_at, created_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(input.title.trim())
        .bind(&input.department)
        .bind(&input.location)
        .bind(input.employment_type.as_str())
        .bind(input.salary_min)
        .bind(input.salary_max)
        .bind(&currency)
        .bind(&input.description)
        .bind(&input.requirements)
        .bind(&input.benefits)
        .bind(input.remote_allowed)
        .bind(JobStatus::Draft.as_str())
        .bind(input.minimum_experience as i64)
        .bind(&input.preferred_education)
        .bind(input.role_level.as_str())
        .bind(serde_json::to_string(&input.required_skills)?)
        .bind(serde_json::to_string(&input.preferred_skills)?)
        .bind(&input.company_name)
        .bind(source_url)
        .bind(extracted_at)
        .bind(method.as_str())
        .bind(now)
        .bind(now)
        .bind(created_by)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Job posting {}", id)))
    }

    /// Change the status; every move to ACTIVE restamps `posted_at`
    pub async fn update_status(&self, id: &str, status: JobStatus) -> StoreResult<JobPosting> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE job_postings
            SET status = ?,
                updated_at = ?,
                posted_at = CASE WHEN ? = 'ACTIVE' THEN ? ELSE posted_at END
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Job posting {}", id)));
        }

        info!("Updated job posting {} status to {}", id, status);

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Job posting {}", id)))
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<JobPosting>> {
        let row = sqlx::query("SELECT * FROM job_postings WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(row_to_job_posting).transpose()
    }

    /// Newest first
    pub async fn list(&self, filter: &JobPostingFilter) -> StoreResult<Vec<JobPosting>> {
        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = ?");
        }
        if filter.extraction_method.is_some() {
            conditions.push("extraction_method = ?");
        }

        let mut sql = "SELECT * FROM job_postings".to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(method) = filter.extraction_method {
            query = query.bind(method.as_str());
        }

        let rows = query
            .bind(filter.limit.unwrap_or(-1))
            .bind(filter.offset.unwrap_or(0).max(0))
            .fetch_all(self.pool)
            .await?;

        rows.iter().map(row_to_job_posting).collect()
    }

    pub async fn stats(&self) -> StoreResult<JobPostingStats> {
        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM job_postings GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        let by_method: Vec<(String, i64)> = sqlx::query_as(
            "SELECT extraction_method, COUNT(*) FROM job_postings GROUP BY extraction_method",
        )
        .fetch_all(self.pool)
        .await?;

        let by_status: BTreeMap<String, i64> = by_status.into_iter().collect();
        let method_count = |method: ExtractionMethod| {
            by_method
                .iter()
                .find(|(m, _)| m == method.as_str())
                .map(|(_, count)| *count)
                .unwrap_or(0)
        };

        Ok(JobPostingStats {
            total: by_status.values().sum(),
            ai_extracted: method_count(ExtractionMethod::AiExtracted),
            manual: method_count(ExtractionMethod::Manual),
            by_status,
        })
    }
}

fn row_to_job_posting(row: &SqliteRow) -> StoreResult<JobPosting> {
    let id: String = row.try_get("id")?;
    let status_raw: String = row.try_get("status")?;
    let status = status_raw
        .parse::<JobStatus>()
        .map_err(|e| StoreError::Corrupt(format!("{} ({})", e, id)))?;
    let required_skills: String = row.try_get("required_skills")?;
    let preferred_skills: String = row.try_get("preferred_skills")?;
    let minimum_experience: i64 = row.try_get("minimum_experience")?;

    Ok(JobPosting {
        title: row.try_get("title")?,
        department: row.try_get("department")?,
        location: row.try_get("location")?,
        employment_type: EmploymentType::parse(&row.try_get::<String, _>("employment_type")?),
        salary_min: row.try_get("salary_min")?,
        salary_max: row.try_get("salary_max")?,
        salary_currency: row.try_get("salary_currency")?,
        description: row.try_get("description")?,
        requirements: row.try_get("requirements")?,
        benefits: row.try_get("benefits")?,
        remote_allowed: row.try_get("remote_allowed")?,
        status,
        minimum_experience: minimum_experience.max(0) as u32,
        preferred_education: row.try_get("preferred_education")?,
        role_level: RoleLevel::parse(&row.try_get::<String, _>("role_level")?),
        required_skills: serde_json::from_str(&required_skills)?,
        preferred_skills: serde_json::from_str(&preferred_skills)?,
        company_name: row.try_get("company_name")?,
        source_url: row.try_get("source_url")?,
        extracted_at: row.try_get("extracted_at")?,
        extraction_method: ExtractionMethod::parse(
            &row.try_get::<String, _>("extraction_method")?,
        ),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        posted_at: row.try_get("posted_at")?,
        closes_at: row.try_get("closes_at")?,
        created_by: row.try_get("created_by")?,
        id,
    })
}
