//! OpenRouter backend (OpenAI-compatible chat completions).

use super::{classify_status, classify_transport, GenerationBackend, GenerationRequest, SamplingParams};
use crate::error::{GenerationError, GenerationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

pub struct OpenRouterBackend {
    api_key: String,
    model: String,
    api_base: String,
    params: SamplingParams,
    client: reqwest::Client,
}

impl OpenRouterBackend {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            api_base: OPENROUTER_API_BASE.to_string(),
            params: SamplingParams::default(),
            client,
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_instruction {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user_message.clone(),
        });
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_output_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenRouterBackend {
    fn provider(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "PAGI-BrandVoice")
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let text = res.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Unknown(format!("OpenRouter response parse failed: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::Unknown("OpenRouter returned no reply".to_string()))
    }

    async fn list_models(&self) -> GenerationResult<Vec<String>> {
        let url = format!("{}/models", self.api_base);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(classify_transport)?;
        let status = res.status();
        let text = res.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        let parsed: ModelsResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Unknown(format!("OpenRouter model list parse failed: {}", e)))?;
        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_precedes_user() {
        let b = OpenRouterBackend::new("k".into(), "m", Duration::from_secs(5));
        let json = serde_json::to_value(b.build_body(&GenerationRequest {
            system_instruction: Some("sys".into()),
            user_message: "hi".into(),
        }))
        .unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn single_message_without_system() {
        let b = OpenRouterBackend::new("k".into(), "m", Duration::from_secs(5));
        let json = serde_json::to_value(b.build_body(&GenerationRequest {
            system_instruction: None,
            user_message: "hi".into(),
        }))
        .unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }
}
