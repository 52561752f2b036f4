// src/core/service_client.rs
//! HTTP client for the document conversion service (ConvertAPI-compatible)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::core::config_manager::ConversionConfig;
use crate::tools::{ConversionError, DocumentConverter};
use crate::utils::{content_type_for, conversion_format};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConversionResponse {
    #[serde(default)]
    files: Vec<ConvertedFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConvertedFile {
    file_name: Option<String>,
    url: Option<String>,
}

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ServiceClient {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self, ConversionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &ConversionConfig) -> Result<Self, ConversionError> {
        Self::new(
            config.base_url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn convert_url(&self, from: &str) -> String {
        format!("{}/convert/{}/to/txt", self.base_url, from)
    }

    /// Upload a document, then download the text file the service produced
    pub async fn convert_to_text(&self, file_name: &str, content: &[u8]) -> Result<String, ConversionError> {
        let token = self.token.as_deref().ok_or(ConversionError::NotConfigured)?;
        let from = conversion_format(file_name)
            .map_err(|e| ConversionError::UnsupportedFormat(e.to_string()))?;
        let url = self.convert_url(&from);

        let form = Form::new().text("StoreFile", "true").part(
            "File",
            Part::bytes(content.to_vec())
                .file_name(file_name.to_string())
                .mime_str(content_type_for(file_name))?,
        );

        info!("Calling conversion service for {}", file_name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Conversion service error for {}: {} {}", file_name, status, body);
            return Err(ConversionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ConversionResponse = response
            .json()
            .await
            .map_err(|e| ConversionError::InvalidResponse(e.to_string()))?;

        let file = parsed
            .files
            .into_iter()
            .find(|f| f.url.is_some())
            .ok_or_else(|| ConversionError::InvalidResponse("no converted file".to_string()))?;
        let download_url = file.url.unwrap_or_default();

        debug!(
            "Downloading converted file {}",
            file.file_name.as_deref().unwrap_or("<unnamed>")
        );

        let download = self.client.get(&download_url).send().await?;
        let status = download.status();
        if !status.is_success() {
            return Err(ConversionError::Service {
                status: status.as_u16(),
                body: format!("download of {} failed", download_url),
            });
        }

        Ok(download.text().await?)
    }
}

#[async_trait]
impl DocumentConverter for ServiceClient {
    async fn to_text(&self, file_name: &str, content: &[u8]) -> Result<String, ConversionError> {
        self.convert_to_text(file_name, content).await
    }
}
