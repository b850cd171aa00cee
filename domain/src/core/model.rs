//! Model identifier value object
//!
//! Unlike a closed enum of known models, dispatch works on open-ended model
//! definition ids supplied by clients ("claude-code", "gpt-4-codex-x", ...).
//! Family helpers do substring classification over the lowercased id; the
//! agent mode cascade in [`crate::providers`] builds on them.

use serde::{Deserialize, Serialize};

/// An open-ended LLM model identifier (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is a Claude-family model
    pub fn is_claude(&self) -> bool {
        self.0.to_lowercase().contains("claude") || self.0 == "claude-code"
    }

    /// Check if this is a Codex-family model
    pub fn is_codex(&self) -> bool {
        let lower = self.0.to_lowercase();
        lower.contains("codex") || lower.contains("gpt-4-codex")
    }

    /// Check if this is a Gemini-family model
    pub fn is_gemini(&self) -> bool {
        self.0.to_lowercase().contains("gemini") || self.0 == "gemini-code"
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
