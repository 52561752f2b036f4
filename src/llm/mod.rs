// src/llm/mod.rs
//! Chat-completion abstraction used by the agents

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Each chat backend implements this.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's reply text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::ApiError { status: 429, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::HttpError(e) if e.is_timeout())
    }
}

/// Pull the JSON object out of a model reply.
///
/// Models wrap JSON in code fences or surround it with prose; this returns the
/// span from the first `{` to its matching `}` (string-aware), or `None`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the JSON object embedded in a model reply
pub fn parse_json_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let json = extract_json_object(text)
        .ok_or_else(|| LlmError::ParseError("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| LlmError::ParseError(e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every request.
    #[derive(Default)]
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub calls: Mutex<Vec<(Vec<Message>, f32)>>,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(status: u16) -> Self {
            let llm = Self::default();
            llm.replies.lock().unwrap().push_back(Err(LlmError::ApiError {
                status,
                body: "upstream error".to_string(),
            }));
            llm
        }

        pub fn temperatures(&self) -> Vec<f32> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(
            &self,
            messages: Vec<Message>,
            temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push((messages, temperature));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::NotConfigured("no scripted reply".into())))
        }
    }
}
