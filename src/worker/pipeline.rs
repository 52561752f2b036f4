// src/worker/pipeline.rs
//! The application pipeline: extraction, analysis, decision, then routing to
//! auto-rejection, an automatically booked interview, or the HR inbox.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agents::{AnalysisAgent, DecisionAgent, ExtractionAgent};
use crate::core::{ApplicationRepository, ConfigManager, Database, FsOps, JobPostingRepository};
use crate::queue::{ApplicationJob, EnqueueOptions, JobKind, JobQueue, RejectionEmailJob};
use crate::services::calendar::{BusinessHours, InterviewScheduler, MeetingDetails};
use crate::services::email::{self, Mailer};
use crate::services::summary::{hr_summary, hr_summary_with_meeting};
use crate::types::{
    ApplicationStatus, DecisionResult, JobPosting, JobRequirements, ProcessingResult,
    Recommendation, ScheduledMeeting,
};

/// Receives pipeline progress in percent
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, percent: u8);
}

pub struct NoProgress;

#[async_trait]
impl ProgressReporter for NoProgress {
    async fn report(&self, _percent: u8) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    AutoReject,
    ScheduleInterview,
    SendToHr,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload_root: PathBuf,
    pub hr_email: String,
    pub company_name: String,
    pub reject_confidence: f64,
    pub hire_confidence: f64,
    pub rejection_delay_ms: i64,
    pub interview_duration_minutes: u32,
    pub business_hours: BusinessHours,
    pub time_zone: String,
}

impl PipelineSettings {
    pub fn from_config(config: &ConfigManager) -> Self {
        Self {
            upload_root: config.environment.upload_path.clone(),
            hr_email: config.email.hr_email.clone(),
            company_name: config.email.company_name.clone(),
            reject_confidence: config.pipeline.reject_confidence,
            hire_confidence: config.pipeline.hire_confidence,
            rejection_delay_ms: config.pipeline.rejection_delay_ms,
            interview_duration_minutes: config.pipeline.interview_duration_minutes,
            business_hours: BusinessHours::from_config(&config.calendar),
            time_zone: config.calendar.time_zone.clone(),
        }
    }

    pub fn route(&self, decision: &DecisionResult) -> Route {
        match decision.recommendation {
            Recommendation::Reject if decision.confidence >= self.reject_confidence => {
                Route::AutoReject
            }
            Recommendation::Hire if decision.confidence >= self.hire_confidence => {
                Route::ScheduleInterview
            }
            _ => Route::SendToHr,
        }
    }
}

pub struct ApplicationPipeline {
    db: Database,
    queue: JobQueue,
    extraction: ExtractionAgent,
    analysis: AnalysisAgent,
    decision: DecisionAgent,
    scheduler: Arc<dyn InterviewScheduler>,
    mailer: Arc<dyn Mailer>,
    settings: PipelineSettings,
}

/// Position and company shown to the candidate and to HR
struct Opening {
    title: String,
    company: String,
}

impl ApplicationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        queue: JobQueue,
        extraction: ExtractionAgent,
        analysis: AnalysisAgent,
        decision: DecisionAgent,
        scheduler: Arc<dyn InterviewScheduler>,
        mailer: Arc<dyn Mailer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            queue,
            extraction,
            analysis,
            decision,
            scheduler,
            mailer,
            settings,
        }
    }

    /// Run one submission end to end. Any error marks the application FAILED
    /// and is returned so the queue can retry.
    pub async fn process(
        &self,
        job: &ApplicationJob,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessingResult> {
        info!(
            "Processing application {} for {}",
            job.submission_id, job.candidate_name
        );

        match self.run(job, progress).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Application {} failed: {:#}", job.submission_id, e);
                if let Err(store_err) = ApplicationRepository::new(self.db.pool())
                    .update_status(&job.submission_id, ApplicationStatus::Failed, None)
                    .await
                {
                    warn!(
                        "Could not mark application {} as failed: {}",
                        job.submission_id, store_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job: &ApplicationJob,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessingResult> {
        let applications = ApplicationRepository::new(self.db.pool());
        applications
            .update_status(&job.submission_id, ApplicationStatus::Processing, None)
            .await
            .context("Failed to mark application as processing")?;
        progress.report(20).await;

        let posting = self.job_posting(job).await?;
        let files = FsOps::load_submission_files(
            &self.settings.upload_root,
            &job.submission_id,
            &job.file_names,
        )
        .await
        .context("Failed to read uploaded files")?;

        let candidate_data = self
            .extraction
            .execute(&job.candidate_name, &job.candidate_description, &files)
            .await
            .context("Extraction failed")?;
        progress.report(40).await;

        let job_requirements = posting
            .as_ref()
            .map(JobRequirements::from)
            .unwrap_or_default();
        let analysis_result = self
            .analysis
            .execute(&candidate_data, &job_requirements)
            .await
            .context("Analysis failed")?;
        progress.report(60).await;

        let decision_result = self
            .decision
            .execute(&analysis_result, &job.candidate_name)
            .await
            .context("Decision failed")?;
        progress.report(80).await;

        let mut result = ProcessingResult {
            candidate_data,
            analysis_result,
            decision_result,
            job_requirements,
            processed_at: Utc::now(),
            scheduled_meeting: None,
        };

        let opening = Opening {
            title: posting
                .as_ref()
                .map(|p| p.title.clone())
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Position".to_string()),
            company: posting
                .as_ref()
                .map(|p| p.company_or(&self.settings.company_name))
                .unwrap_or_else(|| self.settings.company_name.clone()),
        };

        let status = match self.settings.route(&result.decision_result) {
            Route::AutoReject => {
                self.queue_rejection(job, &opening).await?;
                ApplicationStatus::AutoRejected
            }
            Route::ScheduleInterview => {
                match self.book_interview(job, &opening, &mut result).await {
                    Ok(()) => ApplicationStatus::InterviewScheduled,
                    Err(e) => {
                        warn!(
                            "Auto-scheduling failed for {}, sending to HR instead: {:#}",
                            job.submission_id, e
                        );
                        self.send_hr_summary(job, &opening, &result).await?;
                        ApplicationStatus::SentToHr
                    }
                }
            }
            Route::SendToHr => {
                self.send_hr_summary(job, &opening, &result).await?;
                ApplicationStatus::SentToHr
            }
        };

        applications
            .update_status(&job.submission_id, status, Some(&result))
            .await
            .context("Failed to store processing result")?;
        progress.report(100).await;

        info!(
            "Application {} finished: {} ({} with confidence {})",
            job.submission_id,
            status,
            result.decision_result.recommendation,
            result.decision_result.confidence
        );
        Ok(result)
    }

    async fn job_posting(&self, job: &ApplicationJob) -> Result<Option<JobPosting>> {
        if job.job_posting_id.trim().is_empty() {
            return Ok(None);
        }
        let posting = JobPostingRepository::new(self.db.pool())
            .get(&job.job_posting_id)
            .await
            .context("Failed to load job posting")?;
        if posting.is_none() {
            warn!(
                "Job posting {} for application {} no longer exists, using default requirements",
                job.job_posting_id, job.submission_id
            );
        }
        Ok(posting)
    }

    async fn queue_rejection(&self, job: &ApplicationJob, opening: &Opening) -> Result<()> {
        let payload = RejectionEmailJob {
            submission_id: job.submission_id.clone(),
            candidate_name: job.candidate_name.clone(),
            candidate_email: job.candidate_email.clone(),
            job_title: opening.title.clone(),
            company_name: opening.company.clone(),
        };
        self.queue
            .enqueue(
                JobKind::RejectionEmail,
                &payload,
                EnqueueOptions::delayed(self.settings.rejection_delay_ms),
            )
            .await
            .context("Failed to queue rejection email")?;
        info!(
            "Rejection email for {} queued in {}ms",
            job.candidate_name, self.settings.rejection_delay_ms
        );
        Ok(())
    }

    /// Book the slot, then tell HR and the candidate. The meeting is kept on the
    /// result as soon as it exists, even if a notification fails afterwards.
    async fn book_interview(
        &self,
        job: &ApplicationJob,
        opening: &Opening,
        result: &mut ProcessingResult,
    ) -> Result<()> {
        let details = MeetingDetails {
            candidate_name: job.candidate_name.clone(),
            candidate_email: job.candidate_email.clone(),
            job_title: opening.title.clone(),
            company_name: opening.company.clone(),
            duration_minutes: self.settings.interview_duration_minutes,
            time_slot: None,
        };
        let meeting = self
            .scheduler
            .schedule_interview(&details)
            .await
            .context("Failed to schedule interview")?;
        result.scheduled_meeting = Some(meeting.clone());

        self.send_interview_notifications(job, opening, result, &meeting)
            .await
    }

    async fn send_interview_notifications(
        &self,
        job: &ApplicationJob,
        opening: &Opening,
        result: &ProcessingResult,
        meeting: &ScheduledMeeting,
    ) -> Result<()> {
        let offset = self.settings.business_hours.utc_offset_minutes;
        let summary = hr_summary_with_meeting(
            &job.candidate_name,
            &job.candidate_email,
            result,
            meeting,
            offset,
        );
        self.mailer
            .send(&email::hr_interview_email(
                &self.settings.hr_email,
                &job.candidate_name,
                &opening.title,
                summary,
            ))
            .await
            .context("Failed to send HR summary")?;

        self.mailer
            .send(&email::interview_invitation(
                &job.candidate_email,
                &job.candidate_name,
                &opening.title,
                &opening.company,
                meeting,
                offset,
                &self.settings.time_zone,
            ))
            .await
            .context("Failed to send interview invitation")?;

        info!(
            "Interview for {} scheduled at {} (event {})",
            job.candidate_name, meeting.scheduled_time, meeting.event_id
        );
        Ok(())
    }

    async fn send_hr_summary(
        &self,
        job: &ApplicationJob,
        opening: &Opening,
        result: &ProcessingResult,
    ) -> Result<()> {
        let summary = hr_summary(&job.candidate_name, &job.candidate_email, result);
        self.mailer
            .send(&email::hr_summary_email(
                &self.settings.hr_email,
                &job.candidate_name,
                &opening.title,
                summary,
            ))
            .await
            .context("Failed to send HR summary")?;
        Ok(())
    }

    /// Delivery of a rejection queued earlier by `process`
    pub async fn send_rejection(&self, job: &RejectionEmailJob) -> Result<()> {
        self.mailer
            .send(&email::rejection_email(
                &job.candidate_email,
                &job.candidate_name,
                &job.job_title,
                &job.company_name,
            ))
            .await
            .context("Failed to send rejection email")?;
        info!(
            "Rejection email sent to {} for application {}",
            job.candidate_email, job.submission_id
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::tools::file_processor::testing::PlainTextConverter;
    use crate::tools::FileProcessor;

    pub fn settings(upload_root: PathBuf) -> PipelineSettings {
        PipelineSettings {
            upload_root,
            hr_email: "hr@example.com".to_string(),
            company_name: "Our Company".to_string(),
            reject_confidence: 8.0,
            hire_confidence: 7.0,
            rejection_delay_ms: 120_000,
            interview_duration_minutes: 30,
            business_hours: BusinessHours::default(),
            time_zone: "UTC".to_string(),
        }
    }

    pub fn pipeline(
        db: &Database,
        queue: JobQueue,
        llm: Arc<dyn LlmProvider>,
        scheduler: Arc<dyn InterviewScheduler>,
        mailer: Arc<dyn Mailer>,
        upload_root: PathBuf,
    ) -> ApplicationPipeline {
        ApplicationPipeline::new(
            db.clone(),
            queue,
            ExtractionAgent::new(
                llm.clone(),
                500,
                FileProcessor::new(Arc::new(PlainTextConverter)),
            ),
            AnalysisAgent::new(llm.clone(), 500),
            DecisionAgent::new(llm, 500),
            scheduler,
            mailer,
            settings(upload_root),
        )
    }
}
