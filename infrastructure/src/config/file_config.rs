//! Configuration file schema
//!
//! Everything here has a sensible default, so a missing config file means
//! a working setup pointed at a local LiteLLM gateway.

use arena_application::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub dispatch: DispatchConfig,
    pub retry: RetryConfig,
    pub providers: ProvidersConfig,
    /// Optional JSONL file receiving every run event
    pub run_log: Option<PathBuf>,
}

/// Dispatch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Ceiling on model variants executed per run; extras are dropped
    pub max_models: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_models: 4 }
    }
}

/// Retry behavior for transient provider failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Provider backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// OpenAI-compatible gateway for hosted models and plain chat
    pub litellm_base_url: String,
    pub litellm_api_key: Option<String>,
    /// Flat per-token rate for cost estimates from gateway usage
    pub cost_per_token: f64,

    pub claude_command: String,
    pub claude_args: Vec<String>,
    pub codex_command: String,
    pub codex_args: Vec<String>,
    pub gemini_command: String,
    pub gemini_args: Vec<String>,
    /// Wall-clock limit for one CLI agent invocation
    pub agent_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            litellm_base_url: "http://localhost:4000".to_string(),
            litellm_api_key: None,
            cost_per_token: 0.0,
            claude_command: "claude".to_string(),
            claude_args: vec!["-p".to_string()],
            codex_command: "codex".to_string(),
            codex_args: vec!["exec".to_string()],
            gemini_command: "gemini".to_string(),
            gemini_args: vec!["-p".to_string()],
            agent_timeout_secs: 600,
        }
    }
}
