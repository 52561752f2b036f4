// src/agents/job_extraction.rs
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{AgentCore, AgentError};
use crate::llm::LlmProvider;
use crate::tools::WebScraper;
use crate::types::JobPostingInput;

const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = r#"You are a job posting extraction specialist. Extract structured data from job postings on websites.

ALWAYS return a valid JSON object with this exact structure (all fields required, use reasonable defaults if not found):
{
  "title": string,
  "department": string | null,
  "location": string | null,
  "employmentType": "FULL_TIME" | "PART_TIME" | "CONTRACT" | "INTERNSHIP" | "FREELANCE",
  "salaryMin": number | null,
  "salaryMax": number | null,
  "salaryCurrency": string | null,
  "description": string,
  "requirements": string,
  "benefits": string | null,
  "remoteAllowed": boolean,
  "minimumExperience": number,
  "preferredEducation": string | null,
  "roleLevel": "junior" | "mid" | "senior" | "lead",
  "requiredSkills": string[],
  "preferredSkills": string[],
  "companyName": string | null
}

Guidelines:
- If salary is not mentioned, set salaryMin and salaryMax to null
- For remoteAllowed, look for words like "remote", "work from home", "WFH", "hybrid"
- Estimate roleLevel based on title and requirements (junior: 0-2 years, mid: 2-5 years, senior: 5+ years, lead: 8+ years)
- Extract ALL technical skills, frameworks, languages, tools mentioned
- Separate required vs preferred skills based on language like "must have" vs "nice to have"
- For minimumExperience, extract years required or estimate based on role level
- Clean up and format the description and requirements as readable text"#;

pub struct JobExtractionAgent {
    core: AgentCore,
    scraper: WebScraper,
}

impl JobExtractionAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, scraper: WebScraper) -> Self {
        Self {
            core: AgentCore::new(llm, max_tokens),
            scraper,
        }
    }

    pub async fn execute(&self, url: &str) -> Result<JobPostingInput, AgentError> {
        info!("Job extraction agent: processing {}", url);

        let content = self.scraper.scrape(url).await?;
        let prompt = format!(
            "Extract job posting information from this webpage content:\n\n\
             URL: {}\n\n\
             Content:\n{}\n\n\
             Focus on extracting:\n\
             - Job title and company name\n\
             - Department/team if mentioned\n\
             - Location and remote work policy\n\
             - Employment type and salary range\n\
             - Detailed job description and responsibilities\n\
             - Requirements and qualifications\n\
             - Technical skills (required vs preferred)\n\
             - Experience level needed\n\
             - Benefits and perks\n\
             - Education requirements",
            url, content
        );

        let parsed = self
            .core
            .ask_json::<Value>("Job extraction agent", SYSTEM_PROMPT, prompt, TEMPERATURE)
            .await?;

        let Some(parsed) = parsed.filter(Value::is_object) else {
            return Ok(JobPostingInput::extraction_fallback());
        };

        let job = JobPostingInput::from_extracted(&parsed);
        info!(
            title = %job.title,
            company = job.company_name.as_deref().unwrap_or("-"),
            skills = job.required_skills.len(),
            experience = job.minimum_experience,
            "Job extraction agent: successfully extracted job data"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::tools::web_scraper::testing::StaticPage;
    use crate::tools::ScrapeError;
    use crate::types::{EmploymentType, RoleLevel};

    fn scraper(page: Result<String, u16>) -> WebScraper {
        WebScraper::new(Arc::new(StaticPage(page)))
    }

    #[tokio::test]
    async fn test_job_extraction_normalizes_reply() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"title": "Rust Engineer", "employmentType": "CONTRACT", "roleLevel": "staff", "salaryMin": "90000", "requiredSkills": ["Rust"], "remoteAllowed": true, "companyName": "Acme"}"#,
        ]));
        let agent = JobExtractionAgent::new(
            llm.clone(),
            1500,
            scraper(Ok("<main>We need a Rust engineer</main>".to_string())),
        );

        let job = agent.execute("https://jobs.example.com/1").await.unwrap();

        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.employment_type, EmploymentType::Contract);
        assert_eq!(job.role_level, RoleLevel::Mid);
        assert_eq!(job.salary_min, Some(90000.0));
        assert!(job.remote_allowed);
        assert_eq!(job.company_name.as_deref(), Some("Acme"));

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].0[1].content.contains("We need a Rust engineer"));
        assert!(calls[0].0[1].content.contains("URL: https://jobs.example.com/1"));
    }

    #[tokio::test]
    async fn test_job_extraction_fallback_on_unparseable_reply() {
        let llm = Arc::new(ScriptedLlm::new(vec!["Sorry, no idea"]));
        let agent = JobExtractionAgent::new(llm, 1500, scraper(Ok("<p>x</p>".to_string())));

        let job = agent.execute("https://jobs.example.com/2").await.unwrap();
        assert_eq!(job, JobPostingInput::extraction_fallback());
    }

    #[tokio::test]
    async fn test_job_extraction_surfaces_scrape_errors() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let agent = JobExtractionAgent::new(llm.clone(), 1500, scraper(Err(0)));

        let err = agent.execute("https://jobs.example.com/3").await.unwrap_err();
        assert!(matches!(err, AgentError::Scrape(ScrapeError::Timeout)));
        assert!(llm.calls.lock().unwrap().is_empty());
    }
}
