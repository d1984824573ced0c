//! Gemini backend: `models/{model}:generateContent` on the Generative Language API.

use super::{classify_status, classify_transport, GenerationBackend, GenerationRequest, SamplingParams};
use crate::error::{GenerationError, GenerationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfigBody>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

pub struct GeminiBackend {
    api_key: String,
    model: String,
    api_base: String,
    params: SamplingParams,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: model.trim_start_matches("models/").to_string(),
            api_base: GEMINI_API_BASE.to_string(),
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

    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let generation_config = if self.params.temperature.is_some() || self.params.max_output_tokens.is_some() {
            Some(GenerationConfigBody {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_output_tokens,
            })
        } else {
            None
        };
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.user_message.clone(),
                }],
            }],
            system_instruction: request.system_instruction.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part { text: s.clone() }],
            }),
            generation_config,
        }
    }
}

/// Concatenated text of the first candidate, or the reason there is none.
fn extract_text(parsed: GenerateContentResponse) -> GenerationResult<String> {
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(GenerationError::Unknown(format!("Gemini returned no reply ({})", reason)));
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "empty".to_string());
        return Err(GenerationError::Unknown(format!("Gemini returned empty text (finish reason: {})", reason)));
    }
    Ok(text)
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let text = res.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Unknown(format!("Gemini response parse failed: {}", e)))?;
        extract_text(parsed)
    }

    async fn list_models(&self) -> GenerationResult<Vec<String>> {
        let url = format!("{}/models", self.api_base);
        let res = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(classify_transport)?;
        let status = res.status();
        let text = res.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        let parsed: ListModelsResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Unknown(format!("Gemini model list parse failed: {}", e)))?;
        Ok(parsed
            .models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        GeminiBackend::new("key".into(), "models/gemini-1.5-flash", Duration::from_secs(5))
    }

    #[test]
    fn strips_models_prefix() {
        assert_eq!(backend().model(), "gemini-1.5-flash");
    }

    #[test]
    fn body_uses_camel_case_and_omits_empty_config() {
        let b = backend();
        let body = b.build_body(&GenerationRequest {
            system_instruction: Some("sys".into()),
            user_message: "hi".into(),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn body_carries_sampling_params() {
        let b = backend().with_params(SamplingParams {
            temperature: Some(0.5),
            max_output_tokens: Some(256),
        });
        let json = serde_json::to_value(b.build_body(&GenerationRequest {
            system_instruction: None,
            user_message: "hi".into(),
        }))
        .unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn extracts_joined_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Sit "},{"text":"back."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "Sit back.");
    }

    #[test]
    fn blocked_prompt_is_unknown_with_reason() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = extract_text(parsed).unwrap_err();
        assert!(matches!(err, GenerationError::Unknown(ref d) if d.contains("SAFETY")));
    }
}
