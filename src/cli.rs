// src/cli.rs
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::agents::{AnalysisAgent, DecisionAgent, ExtractionAgent, JobExtractionAgent};
use crate::core::{ApplicationRepository, ConfigManager, Database, JobPostingRepository, ServiceClient};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::queue::JobQueue;
use crate::services::{
    build_mailer, GoogleCalendar, InterviewScheduler, MeetingDetails, UnavailableCalendar,
};
use crate::tools::{FileProcessor, HttpPageFetcher, WebScraper};
use crate::types::{ApplicationStatus, ApplicationWithJobPosting, ScheduledMeeting};
use crate::web::{start_web_server, AppState};
use crate::worker::{ApplicationPipeline, PipelineSettings, Worker};

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "hiring-pipeline")]
#[command(about = "Candidate screening API and background worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve,
    /// Process queued applications and rejection emails
    Worker,
    /// HTTP API and worker in one process
    Run,
    /// Extract a job posting from a web page and print it as JSON
    ExtractJob {
        url: String,
        /// Store the result as a draft job posting
        #[arg(long)]
        save: bool,
    },
    /// Book a test interview on the configured calendar
    ScheduleTest {
        #[arg(long, default_value = "Test Candidate")]
        name: String,
        /// Defaults to the HR mailbox
        #[arg(long)]
        email: Option<String>,
        /// Leave the event in the calendar instead of cancelling it
        #[arg(long)]
        keep: bool,
        /// Move the booked event one day later before cancelling it
        #[arg(long)]
        reschedule: bool,
    },
    /// Write applications to a CSV file
    ExportApplications {
        output: PathBuf,
        #[arg(long)]
        status: Option<String>,
    },
}

/// Handles built once per process and shared by every command
pub struct Services {
    pub config: ConfigManager,
    pub db: Database,
    pub queue: JobQueue,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl Services {
    pub async fn init(config: ConfigManager) -> Result<Self> {
        config.ensure_directories().await?;

        let db = Database::connect(&config.environment.database_path).await?;
        let queue = JobQueue::new(db.pool().clone(), config.queue.clone());

        let llm = match OpenAiProvider::from_config(&config.llm) {
            Ok(provider) => Some(Arc::new(provider) as Arc<dyn LlmProvider>),
            Err(e) => {
                warn!("LLM provider unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            config,
            db,
            queue,
            llm,
        })
    }

    fn require_llm(&self) -> Result<Arc<dyn LlmProvider>> {
        self.llm
            .clone()
            .context("OPENAI_API_KEY must be set for this command")
    }

    pub fn job_extractor(&self) -> Result<Option<Arc<JobExtractionAgent>>> {
        let Some(llm) = self.llm.clone() else {
            return Ok(None);
        };
        let scraper = WebScraper::new(Arc::new(HttpPageFetcher::new(SCRAPE_TIMEOUT)?));
        Ok(Some(Arc::new(JobExtractionAgent::new(
            llm,
            self.config.llm.max_tokens,
            scraper,
        ))))
    }

    fn scheduler(&self) -> Arc<dyn InterviewScheduler> {
        match GoogleCalendar::from_config(&self.config.calendar, &self.config.email.hr_email) {
            Ok(calendar) => Arc::new(calendar),
            Err(e) => {
                warn!("Interview scheduling disabled: {}", e);
                Arc::new(UnavailableCalendar::new(e.to_string()))
            }
        }
    }

    pub fn pipeline(&self) -> Result<ApplicationPipeline> {
        let llm = self.require_llm()?;
        let max_tokens = self.config.llm.max_tokens;
        let converter = ServiceClient::from_config(&self.config.conversion)?;
        let mailer = build_mailer(&self.config.email, self.config.is_production())?;

        Ok(ApplicationPipeline::new(
            self.db.clone(),
            self.queue.clone(),
            ExtractionAgent::new(llm.clone(), max_tokens, FileProcessor::new(Arc::new(converter))),
            AnalysisAgent::new(llm.clone(), max_tokens),
            DecisionAgent::new(llm, max_tokens),
            self.scheduler(),
            mailer,
            PipelineSettings::from_config(&self.config),
        ))
    }

    pub fn worker(&self) -> Result<Worker> {
        Ok(Worker::new(
            self.queue.clone(),
            Arc::new(self.pipeline()?),
            self.config.worker.clone(),
        ))
    }

    pub fn app_state(&self) -> Result<AppState> {
        Ok(AppState::new(
            &self.config,
            self.db.clone(),
            self.queue.clone(),
            self.job_extractor()?,
        ))
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = ConfigManager::load()?;
    let services = Services::init(config).await?;

    match cli.command {
        Command::Serve => start_web_server(&services.config, services.app_state()?).await,

        Command::Worker => {
            let worker = services.worker()?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    let _ = shutdown_tx.send(true);
                }
            });
            worker.run(shutdown_rx).await
        }

        Command::Run => {
            let worker = services.worker()?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

            // Rocket handles ctrl-c itself; the worker stops once the server returns
            let served = start_web_server(&services.config, services.app_state()?).await;
            let _ = shutdown_tx.send(true);

            match worker_task.await {
                Ok(Err(e)) => error!("Worker stopped with error: {:#}", e),
                Err(e) => error!("Worker task panicked: {}", e),
                Ok(Ok(())) => {}
            }
            served
        }

        Command::ExtractJob { url, save } => extract_job(&services, &url, save).await,

        Command::ScheduleTest {
            name,
            email,
            keep,
            reschedule,
        } => schedule_test(&services, name, email, keep, reschedule).await,

        Command::ExportApplications { output, status } => {
            export_applications(&services, &output, status.as_deref()).await
        }
    }
}

async fn extract_job(services: &Services, url: &str, save: bool) -> Result<()> {
    let agent = services
        .job_extractor()?
        .context("OPENAI_API_KEY must be set to extract job postings")?;

    let data = agent
        .execute(url)
        .await
        .with_context(|| format!("Failed to extract job posting from {}", url))?;

    println!("{}", serde_json::to_string_pretty(&data)?);

    if save {
        let posting = JobPostingRepository::new(services.db.pool())
            .create_from_extraction(&data, url, None)
            .await
            .context("Failed to save extracted job posting")?;
        info!("Saved job posting {} ({})", posting.id, posting.title);
    }

    Ok(())
}

async fn schedule_test(
    services: &Services,
    name: String,
    email: Option<String>,
    keep: bool,
    reschedule: bool,
) -> Result<()> {
    let config = &services.config;
    let calendar = GoogleCalendar::from_config(&config.calendar, &config.email.hr_email)
        .context("Calendar is not configured")?;

    let details = MeetingDetails {
        candidate_name: name,
        candidate_email: email.unwrap_or_else(|| config.email.hr_email.clone()),
        job_title: "Calendar Test".to_string(),
        company_name: config.email.company_name.clone(),
        duration_minutes: config.pipeline.interview_duration_minutes,
        time_slot: None,
    };

    calendar_round_trip(&calendar, &details, keep, reschedule).await?;
    Ok(())
}

/// Book, optionally move, then cancel unless `keep`. Returns the last state
/// of the meeting.
async fn calendar_round_trip(
    calendar: &dyn InterviewScheduler,
    details: &MeetingDetails,
    keep: bool,
    reschedule: bool,
) -> Result<ScheduledMeeting> {
    let mut meeting = calendar
        .schedule_interview(details)
        .await
        .context("Failed to schedule test interview")?;

    info!(
        "Test interview booked for {} ({} minutes): {}",
        meeting.scheduled_time, meeting.duration_minutes, meeting.calendar_link
    );

    if reschedule {
        meeting = calendar
            .reschedule_interview(
                &meeting.event_id,
                meeting.scheduled_time + chrono::Duration::days(1),
                meeting.duration_minutes,
            )
            .await
            .context("Failed to reschedule test interview")?;
        info!(
            "Test interview {} moved to {}",
            meeting.event_id, meeting.scheduled_time
        );
    }

    if !keep {
        calendar
            .cancel_interview(&meeting.event_id)
            .await
            .context("Failed to cancel test interview")?;
        info!("Test interview {} cancelled", meeting.event_id);
    }

    Ok(meeting)
}

async fn export_applications(
    services: &Services,
    output: &Path,
    status: Option<&str>,
) -> Result<()> {
    let status = status
        .map(str::parse::<ApplicationStatus>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let repository = ApplicationRepository::new(services.db.pool());
    let mut applications = repository
        .list_with_job_postings()
        .await
        .context("Failed to load applications")?;
    if let Some(status) = status {
        applications.retain(|a| a.application.status == status);
    }

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    write_applications_csv(file, &applications)?;

    info!(
        "Exported {} applications to {} at {}",
        applications.len(),
        output.display(),
        Utc::now().to_rfc3339()
    );
    Ok(())
}

const CSV_HEADER: [&str; 11] = [
    "submission_id",
    "candidate_name",
    "candidate_email",
    "status",
    "submitted_at",
    "processed_at",
    "job_title",
    "company",
    "recommendation",
    "confidence",
    "overall_fit",
];

pub fn write_applications_csv<W: Write>(
    writer: W,
    applications: &[ApplicationWithJobPosting],
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for entry in applications {
        let app = &entry.application;
        let posting = entry.job_posting.as_ref();
        let result = app.result.as_ref();

        csv.write_record([
            app.submission_id.clone(),
            app.candidate_name.clone(),
            app.candidate_email.clone(),
            app.status.as_str().to_string(),
            app.submitted_at.to_rfc3339(),
            app.processed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            posting.map(|p| p.title.clone()).unwrap_or_default(),
            posting
                .and_then(|p| p.company_name.clone())
                .unwrap_or_default(),
            result
                .map(|r| r.decision_result.recommendation.as_str().to_string())
                .unwrap_or_default(),
            result
                .map(|r| r.decision_result.confidence.to_string())
                .unwrap_or_default(),
            result
                .map(|r| r.analysis_result.overall_fit.to_string())
                .unwrap_or_default(),
        ])?;
    }

    csv.flush().context("Failed to write CSV")?;
    Ok(())
}
