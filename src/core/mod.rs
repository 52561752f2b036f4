// src/core/mod.rs
//! Storage, configuration and the outbound conversion client

pub mod applications;
pub mod config_manager;
pub mod database;
pub mod error;
pub mod fs_ops;
pub mod job_postings;
pub mod service_client;

pub use applications::ApplicationRepository;
pub use config_manager::ConfigManager;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use fs_ops::FsOps;
pub use job_postings::{JobPostingFilter, JobPostingRepository};
pub use service_client::ServiceClient;
