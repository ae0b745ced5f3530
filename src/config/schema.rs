//! Configuration schema for cargoscout.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON config
//! file can use camelCase keys while Rust code uses snake_case fields.

use serde::{Deserialize, Serialize};

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_steps() -> u32 {
    20
}

fn default_planning_interval() -> u32 {
    4
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_tool_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    6
}

fn default_min_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    60
}

/// Model endpoint settings. Any OpenAI-compatible chat completions API works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Retry policy for model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Run budget and timeout settings for the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_planning_interval")]
    pub planning_interval: u32,
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            planning_interval: default_planning_interval(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

/// API keys for the external data providers the tools wrap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    /// serper.dev key for place search.
    #[serde(default)]
    pub serper_api_key: String,
    /// Brave Search key for web search.
    #[serde(default)]
    pub brave_api_key: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Fill in API keys from the environment where the file left them blank.
    pub fn apply_env_overrides(&mut self) {
        if self.model.api_key.is_empty() {
            if let Ok(key) = std::env::var("CARGOSCOUT_MODEL_API_KEY") {
                self.model.api_key = key;
            }
        }
        if self.providers.serper_api_key.is_empty() {
            if let Ok(key) = std::env::var("SERPER_API_KEY") {
                self.providers.serper_api_key = key;
            }
        }
        if self.providers.brave_api_key.is_empty() {
            if let Ok(key) = std::env::var("BRAVE_API_KEY") {
                self.providers.brave_api_key = key;
            }
        }
    }
}
