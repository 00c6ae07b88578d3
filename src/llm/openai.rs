//! Chat-completion and vision clients for OpenAI-compatible endpoints

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::{GenerationConfig, VisionConfig};
use crate::error::GenerationError;
use crate::llm::{ChatModel, VisionModel};

fn build_client(api_key: &str, timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    if api_key.trim().is_empty() {
        return Err(GenerationError::InvalidApiKey);
    }
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).map_err(|_| GenerationError::InvalidApiKey)?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .default_headers(headers)
        .build()
        .map_err(|e| GenerationError::ClientBuildFailed(e.to_string()))
}

async fn send_chat(
    client: &reqwest::Client,
    endpoint: &str,
    body: &serde_json::Value,
) -> Result<String, GenerationError> {
    let response = client
        .post(endpoint)
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(GenerationError::RequestFailed {
            status: status.to_string(),
            body,
        });
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| GenerationError::Transport(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

/// Text-generation client, one instance per process
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(api_key: &str, config: &GenerationConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(api_key, config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: usize,
    ) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        send_chat(&self.client, &self.endpoint, &body).await
    }
}

/// Vision client: ships the image as a base64 data URL content part
pub struct OpenAiVisionModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiVisionModel {
    pub fn new(
        api_key: &str,
        generation: &GenerationConfig,
        config: &VisionConfig,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(api_key, generation.timeout_secs)?,
            endpoint: format!(
                "{}/chat/completions",
                generation.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl VisionModel for OpenAiVisionModel {
    async fn describe_image(
        &self,
        image_path: &Path,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let bytes =
            tokio::fs::read(image_path)
                .await
                .map_err(|e| GenerationError::ImageUnreadable {
                    path: image_path.display().to_string(),
                    reason: e.to_string(),
                })?;
        let data_url = format!(
            "data:{};base64,{}",
            mime_for(image_path),
            BASE64.encode(&bytes)
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
        });
        send_chat(&self.client, &self.endpoint, &body).await
    }
}

/// Mime type by file extension; extraction only produces jpg/jp2
fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("jp2") => "image/jp2",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
