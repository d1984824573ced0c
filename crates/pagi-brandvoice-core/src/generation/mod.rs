//! Generation client: one call to the hosted model per turn, classified failures, no retry.

mod gemini;
mod openrouter;

pub use gemini::GeminiBackend;
pub use openrouter::OpenRouterBackend;

use crate::config::{GenerationConfig, GenerationProvider};
use crate::error::{ConfigError, GenerationError, GenerationResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What the capability receives: an optional system instruction and one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub user_message: String,
}

/// Sampling knobs forwarded to the provider when set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn provider(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String>;

    /// Model ids the credential can see. Diagnostics only; never used to pick a model.
    async fn list_models(&self) -> GenerationResult<Vec<String>>;
}

/// Thin facade over a backend: trims output and logs the outcome.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Backend for the configured provider. Requires a resolved API key.
    pub fn from_config(cfg: &GenerationConfig) -> Result<Self, ConfigError> {
        let api_key = cfg.resolved_api_key().ok_or(ConfigError::MissingApiKey {
            provider: cfg.provider.name(),
            env_hint: cfg.provider.key_env_hint(),
        })?;
        let model = cfg.resolved_model();
        let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
        let params = SamplingParams {
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        };
        let backend: Arc<dyn GenerationBackend> = match cfg.provider {
            GenerationProvider::Gemini => {
                let mut b = GeminiBackend::new(api_key, &model, timeout).with_params(params);
                if let Some(base) = cfg.api_base.as_deref() {
                    b = b.with_api_base(base);
                }
                Arc::new(b)
            }
            GenerationProvider::OpenRouter => {
                let mut b = OpenRouterBackend::new(api_key, &model, timeout).with_params(params);
                if let Some(base) = cfg.api_base.as_deref() {
                    b = b.with_api_base(base);
                }
                Arc::new(b)
            }
        };
        Ok(Self::new(backend))
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Sends the full composed instruction as a single user message.
    pub async fn generate(&self, full_instruction: &str) -> GenerationResult<String> {
        self.generate_request(&GenerationRequest {
            system_instruction: None,
            user_message: full_instruction.to_string(),
        })
        .await
    }

    pub async fn generate_request(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let started = std::time::Instant::now();
        match self.backend.complete(request).await {
            Ok(text) => {
                let text = text.trim().to_string();
                tracing::info!(
                    provider = self.backend.provider(),
                    model = self.backend.model(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    reply_chars = text.chars().count(),
                    "generation succeeded"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.backend.provider(),
                    model = self.backend.model(),
                    kind = ?e.kind(),
                    "generation failed: {}",
                    e.detail()
                );
                Err(e)
            }
        }
    }
}

/// Maps an HTTP failure to the error taxonomy.
pub fn classify_status(status: u16, body: &str) -> GenerationError {
    let detail = format!("HTTP {}: {}", status, truncate(body, 500));
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return GenerationError::RateLimited(detail);
    }
    match status {
        400 | 401 | 403 | 404 => GenerationError::BadRequest(detail),
        500 | 502 | 503 | 504 => GenerationError::ServerUnavailable(detail),
        _ => GenerationError::Unknown(detail),
    }
}

/// Maps a transport error to the error taxonomy.
pub(crate) fn classify_transport(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() || e.is_connect() {
        GenerationError::ServerUnavailable(e.to_string())
    } else if let Some(status) = e.status() {
        classify_status(status.as_u16(), &e.to_string())
    } else {
        GenerationError::Unknown(e.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}
