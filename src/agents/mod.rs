// src/agents/mod.rs
//! LLM agents. Each one formats a prompt, calls the provider and parses the JSON
//! reply; unparseable replies become fallback values, transport failures propagate.

pub mod analysis;
pub mod decision;
pub mod extraction;
pub mod job_extraction;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::llm::{parse_json_reply, LlmError, LlmProvider, Message};
use crate::tools::ScrapeError;

pub use analysis::AnalysisAgent;
pub use decision::DecisionAgent;
pub use extraction::ExtractionAgent;
pub use job_extraction::JobExtractionAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

/// Shared plumbing: provider handle, token budget and reply parsing
#[derive(Clone)]
pub(crate) struct AgentCore {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl AgentCore {
    pub(crate) fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    async fn ask(&self, system: &str, user: String, temperature: f32) -> Result<String, LlmError> {
        self.llm
            .complete(
                vec![Message::system(system), Message::user(user)],
                temperature,
                self.max_tokens,
            )
            .await
    }

    /// Ask and parse; `None` means the reply was not the JSON we asked for
    async fn ask_json<T: serde::de::DeserializeOwned>(
        &self,
        agent: &str,
        system: &str,
        user: String,
        temperature: f32,
    ) -> Result<Option<T>, LlmError> {
        let reply = self.ask(system, user, temperature).await?;
        debug!("{} raw reply: {}", agent, reply);

        match parse_json_reply::<T>(&reply) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                error!("{} JSON parse error: {}", agent, e);
                Ok(None)
            }
        }
    }
}

fn list_or(items: &[String], empty: &str) -> String {
    crate::utils::comma_list(items, empty)
}
