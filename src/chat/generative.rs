//! Generative-text backend for the legal assistant.
//!
//! Supports the Ollama API for local inference. The backend is treated as
//! opaque: one prompt in, one completion out. Hosted backends implement the
//! same trait.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

fn default_enabled() -> bool {
    true
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2:instruct".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    // Low temperature keeps legal answers factual and consistent.
    0.3
}

/// Configuration for the generative backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether assistant responses are enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Ollama API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used for responses.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Generation temperature (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Errors from the generative backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("LLM is disabled")]
    Disabled,
}

/// A backend that completes prompts.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Complete a prompt. May block on network I/O for a long time; callers
    /// treat it as cancellable and must not assume ordering between
    /// overlapping calls.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Whether the backend is reachable.
    async fn is_available(&self) -> bool;
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Generative backend speaking the Ollama API.
pub struct OllamaBackend {
    config: LlmConfig,
    client: Client,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // slow local models
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let url = format!("{}/api/generate", self.config.endpoint);
        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        debug!("Sending prompt to {} ({})", url, self.config.model);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        let body: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Parse("Empty completion".to_string()));
        }
        Ok(text)
    }

    async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let url = format!("{}/api/tags", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
