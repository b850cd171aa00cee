//! Agent mode selection
//!
//! Every model variant executes through one of a fixed set of strategies.
//! Which strategy applies is decided by [`AgentMode::select`], a pure
//! function over the model id and the turn's context string.

use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};

/// Execution strategy for a model variant (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentMode {
    /// Plain conversational exchange, no coding agent
    Chat,
    /// CLI-wrapped Claude coding agent
    ClaudeCli,
    /// CLI-wrapped OpenAI Codex agent
    OpenaiCodex,
    /// CLI-wrapped Gemini agent
    GeminiCli,
    /// Generic hosted gateway fallback
    Litellm,
}

impl AgentMode {
    /// Resolve the agent mode for a model id and context hint.
    ///
    /// The rules are an ordered cascade; earlier rules short-circuit later
    /// ones. The order is a tested contract:
    ///  1. Context containing "chat" (case-insensitive) wins over every
    ///     model-based rule.
    ///  2. Claude-family ids (or the literal `claude-code`) → `ClaudeCli`.
    ///  3. Codex-family ids (`codex`, `gpt-4-codex`) → `OpenaiCodex`.
    ///  4. Gemini-family ids (or the literal `gemini-code`) → `GeminiCli`.
    ///  5. Anything else falls back to the `Litellm` gateway.
    ///
    /// Pure and total: never fails, no side effects.
    pub fn select(model: &ModelId, context: &str) -> AgentMode {
        if context.to_lowercase().contains("chat") {
            return AgentMode::Chat;
        }

        if model.is_claude() {
            AgentMode::ClaudeCli
        } else if model.is_codex() {
            AgentMode::OpenaiCodex
        } else if model.is_gemini() {
            AgentMode::GeminiCli
        } else {
            AgentMode::Litellm
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentMode::Chat => "chat",
            AgentMode::ClaudeCli => "claude-cli",
            AgentMode::OpenaiCodex => "openai-codex",
            AgentMode::GeminiCli => "gemini-cli",
            AgentMode::Litellm => "litellm",
        }
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
