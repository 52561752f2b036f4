// src/types/mod.rs
pub mod application;
mod coerce;
pub mod job_posting;
pub mod pipeline;

pub use application::{
    Application, ApplicationFilter, ApplicationStats, ApplicationStatus,
    ApplicationWithJobPosting, NewApplication,
};
pub use job_posting::{
    EmploymentType, ExtractionMethod, JobPosting, JobPostingInput, JobPostingStats, JobStatus,
    RoleLevel,
};
pub use pipeline::{
    AnalysisResult, CandidateData, DecisionResult, JobRequirements, ProcessingResult,
    Recommendation, ScheduledMeeting,
};
