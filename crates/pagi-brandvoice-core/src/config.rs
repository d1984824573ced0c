//! Typed configuration, loaded once at startup and injected into the components.
//!
//! Precedence: built-in defaults < TOML file (`BRANDVOICE_CONFIG`, default `config/brandvoice.toml`)
//! < environment with prefix `BRANDVOICE` and `__` as the section separator.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | BRANDVOICE_GENERATION__PROVIDER | gemini | `gemini` \| `openrouter` |
//! | BRANDVOICE_GENERATION__API_KEY | (none) | Falls back to GEMINI_API_KEY / GOOGLE_API_KEY or OPENROUTER_API_KEY |
//! | BRANDVOICE_GENERATION__MODEL | per provider | Fixed model id; never discovered at runtime |
//! | BRANDVOICE_FEEDBACK__BACKEND | sheets | `sheets` \| `sled` \| `memory` \| `disabled` |
//! | BRANDVOICE_FEEDBACK__SPREADSHEET_ID | (none) | Destination spreadsheet for the `sheets` backend |
//! | BRANDVOICE_FEEDBACK__ACCESS_TOKEN | (none) | OAuth bearer token for the Sheets API |
//! | BRANDVOICE_NEGATIVE_WINDOW | 10 | Most recent negative examples folded into prompts |
//! | BRANDVOICE_SESSION_IDLE_SECS | 1800 | Gateway sessions untouched this long are evicted |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/brandvoice";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";
pub const DEFAULT_NEGATIVE_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    #[default]
    Gemini,
    #[serde(rename = "openrouter", alias = "open_router")]
    OpenRouter,
}

impl GenerationProvider {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationProvider::Gemini => "gemini",
            GenerationProvider::OpenRouter => "openrouter",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            GenerationProvider::Gemini => DEFAULT_GEMINI_MODEL,
            GenerationProvider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        }
    }

    fn key_env_vars(&self) -> &'static [&'static str] {
        match self {
            GenerationProvider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            GenerationProvider::OpenRouter => &["OPENROUTER_API_KEY"],
        }
    }

    pub(crate) fn key_env_hint(&self) -> &'static str {
        match self {
            GenerationProvider::Gemini => "GEMINI_API_KEY",
            GenerationProvider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Empty means "use the provider default".
    #[serde(default)]
    pub model: Option<String>,
    /// Override for the provider base URL (proxies, regional endpoints).
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            api_key: None,
            model: None,
            api_base: None,
            temperature: None,
            max_output_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    /// Configured key, then provider-specific environment variables.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.provider
                    .key_env_vars()
                    .iter()
                    .find_map(|name| std::env::var(name).ok())
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackBackend {
    #[default]
    Sheets,
    Sled,
    Memory,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub backend: FeedbackBackend,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Worksheet (tab) name holding the feedback table.
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_sled_path")]
    pub sled_path: String,
}

fn default_worksheet() -> String {
    "feedback".to_string()
}

fn default_sled_path() -> String {
    "./data/brandvoice_feedback".to_string()
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            backend: FeedbackBackend::default(),
            spreadsheet_id: None,
            worksheet: default_worksheet(),
            access_token: None,
            sled_path: default_sled_path(),
        }
    }
}

/// Application configuration for the brand-voice chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandVoiceConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default = "default_negative_window")]
    pub negative_window: usize,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Idle lifetime of a gateway session.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_negative_window() -> usize {
    DEFAULT_NEGATIVE_WINDOW
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

impl Default for BrandVoiceConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            feedback: FeedbackConfig::default(),
            negative_window: default_negative_window(),
            bind_addr: default_bind_addr(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl BrandVoiceConfig {
    /// Load from `BRANDVOICE_CONFIG` (or `config/brandvoice.toml`) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("BRANDVOICE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(Path::new(&config_path))
    }

    /// Load from a specific file (skipped if absent) plus the environment.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .set_default("negative_window", DEFAULT_NEGATIVE_WINDOW as i64)?
            .set_default("bind_addr", default_bind_addr())?;

        let toml_path = path.with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if toml_path.is_file() {
            builder.add_source(config::File::from(toml_path.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("BRANDVOICE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Startup validation. Any error here must block the surrounding application.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.resolved_api_key().is_none() {
            return Err(ConfigError::MissingApiKey {
                provider: self.generation.provider.name(),
                env_hint: self.generation.provider.key_env_hint(),
            });
        }
        if self.negative_window == 0 {
            return Err(ConfigError::Invalid("negative_window must be at least 1".to_string()));
        }
        if self.session_idle_secs == 0 {
            return Err(ConfigError::Invalid("session_idle_secs must be at least 1".to_string()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid("generation.timeout_secs must be at least 1".to_string()));
        }
        if self.feedback.backend == FeedbackBackend::Sheets {
            if is_blank(&self.feedback.spreadsheet_id) {
                return Err(ConfigError::MissingFeedbackDestination);
            }
            if is_blank(&self.feedback.access_token) {
                return Err(ConfigError::MissingFeedbackCredentials);
            }
        }
        Ok(())
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(str::trim).map_or(true, str::is_empty)
}
