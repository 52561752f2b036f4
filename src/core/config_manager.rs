// src/core/config_manager.rs
//! Layered configuration: built-in defaults, then the `config.yaml` section for the
//! current environment, then environment variables for secrets and deployment paths.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::FsOps;

/// Secrets the pipeline cannot run without
pub const REQUIRED_SECRETS: [&str; 4] = [
    "OPENAI_API_KEY",
    "CONVERT_API_TOKEN",
    "EMAIL_USER",
    "EMAIL_PASS",
];

#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    pub environment_name: String,
    pub environment: EnvironmentConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub conversion: ConversionConfig,
    pub email: EmailConfig,
    pub calendar: CalendarConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub database_path: PathBuf,
    pub upload_path: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/hiring.db"),
            upload_path: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub max_upload_mb: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 4002,
            max_upload_mb: 20,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4".to_string(),
            max_tokens: 1500,
            timeout_seconds: 120,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v2.convertapi.com".to_string(),
            timeout_seconds: 120,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_name: String,
    pub hr_email: String,
    pub company_name: String,
    #[serde(skip)]
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            from_name: "HR Agent".to_string(),
            hr_email: "hr@example.com".to_string(),
            company_name: "Our Company".to_string(),
            username: None,
            password: None,
        }
    }
}

impl EmailConfig {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub service_account_key_file: Option<PathBuf>,
    pub calendar_id: String,
    /// IANA name sent with events
    pub time_zone: String,
    /// Offset used for business hours, in minutes east of UTC
    pub utc_offset_minutes: i32,
    pub business_start_hour: u32,
    pub business_end_hour: u32,
    pub search_days: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            service_account_key_file: None,
            calendar_id: "primary".to_string(),
            time_zone: "Europe/Stockholm".to_string(),
            utc_offset_minutes: 60,
            business_start_hour: 9,
            business_end_hour: 17,
            search_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub attempts: u32,
    pub backoff_ms: i64,
    pub keep_completed: i64,
    pub keep_failed: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 2000,
            keep_completed: 50,
            keep_failed: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_interval_ms: u64,
    pub lock_duration_ms: i64,
    pub stalled_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_interval_ms: 1000,
            lock_duration_ms: 30_000,
            stalled_interval_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reject_confidence: f64,
    pub hire_confidence: f64,
    pub rejection_delay_ms: i64,
    pub interview_duration_minutes: u32,
    pub submit_delay_ms: i64,
    pub submit_priority: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reject_confidence: 8.0,
            hire_confidence: 7.0,
            rejection_delay_ms: 2 * 60 * 1000,
            interview_duration_minutes: 30,
            submit_delay_ms: 2000,
            submit_priority: 1,
        }
    }
}

/// One environment section of `config.yaml`; every part is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SectionConfig {
    environment: Option<EnvironmentConfig>,
    server: Option<ServerConfig>,
    llm: Option<LlmConfig>,
    conversion: Option<ConversionConfig>,
    email: Option<EmailConfig>,
    calendar: Option<CalendarConfig>,
    queue: Option<QueueConfig>,
    worker: Option<WorkerConfig>,
    pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: SectionConfig,
    production: SectionConfig,
}

impl ConfigManager {
    /// Load from `CONFIG_FILE` (default `config.yaml`, optional) and the process environment
    pub fn load() -> Result<Self> {
        let environment_name = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", environment_name);

        let config_path =
            PathBuf::from(std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yaml".into()));
        let yaml = if config_path.exists() {
            Some(
                std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?,
            )
        } else {
            info!(
                "{} not found, using built-in defaults",
                config_path.display()
            );
            None
        };

        let config = Self::from_sources(&environment_name, yaml.as_deref(), |key| {
            std::env::var(key).ok()
        })?;
        config.check_required_secrets()?;
        Ok(config)
    }

    /// Build a configuration from explicit sources
    pub fn from_sources<F>(environment_name: &str, yaml: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match yaml {
            Some(content) => serde_yaml::from_str(content).context("Failed to parse config.yaml")?,
            None => ConfigFile::default(),
        };

        let section = match environment_name {
            "production" => file.production,
            _ => file.local,
        };

        let mut config = Self {
            environment_name: environment_name.to_string(),
            environment: section.environment.unwrap_or_default(),
            server: section.server.unwrap_or_default(),
            llm: section.llm.unwrap_or_default(),
            conversion: section.conversion.unwrap_or_default(),
            email: section.email.unwrap_or_default(),
            calendar: section.calendar.unwrap_or_default(),
            queue: section.queue.unwrap_or_default(),
            worker: section.worker.unwrap_or_default(),
            pipeline: section.pipeline.unwrap_or_default(),
        };

        config.apply_env_overrides(&env)?;
        Ok(config)
    }

    fn apply_env_overrides<F>(&mut self, env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        self.llm.api_key = non_empty("OPENAI_API_KEY");
        self.conversion.token = non_empty("CONVERT_API_TOKEN");
        self.email.username = non_empty("EMAIL_USER");
        self.email.password = non_empty("EMAIL_PASS");

        if let Some(hr_email) = non_empty("HR_EMAIL") {
            self.email.hr_email = hr_email;
        }
        if let Some(key_file) = non_empty("GOOGLE_SERVICE_ACCOUNT_KEY_FILE") {
            self.calendar.service_account_key_file = Some(PathBuf::from(key_file));
        }
        if let Some(calendar_id) = non_empty("GOOGLE_CALENDAR_ID") {
            self.calendar.calendar_id = calendar_id;
        }
        if let Some(path) = non_empty("DATABASE_PATH") {
            self.environment.database_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty("UPLOAD_PATH") {
            self.environment.upload_path = PathBuf::from(path);
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment_name == "production"
    }

    /// Names of required secrets that are not set
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let present = [
            self.llm.api_key.is_some(),
            self.conversion.token.is_some(),
            self.email.username.is_some(),
            self.email.password.is_some(),
        ];

        REQUIRED_SECRETS
            .iter()
            .zip(present)
            .filter(|(_, set)| !set)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Missing secrets abort startup in production and are only logged elsewhere
    pub fn check_required_secrets(&self) -> Result<()> {
        let missing = self.missing_secrets();
        if missing.is_empty() {
            return Ok(());
        }

        if self.is_production() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        warn!(
            "Missing environment variables (some features will not work): {}",
            missing.join(", ")
        );
        Ok(())
    }

    /// Ensure the database parent and upload directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.environment.upload_path).await?;

        if let Some(db_parent) = self.environment.database_path.parent() {
            if db_parent != Path::new("") {
                FsOps::ensure_dir_exists(db_parent).await?;
            }
        }

        Ok(())
    }
}
