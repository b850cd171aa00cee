//! Model provider adapters and routing
//!
//! One adapter per agent mode: local CLI agents run as child processes,
//! hosted models go through an OpenAI-compatible HTTP gateway. The router
//! resolves a mode to its registered adapter, falling back to the LiteLLM
//! gateway for anything without a dedicated backend.

mod cli_agent;
mod http_gateway;

pub use cli_agent::CliAgentProvider;
pub use http_gateway::HttpGatewayProvider;

use arena_application::ports::provider::{ModelProvider, ProviderError, ProviderRouter};
use arena_domain::AgentMode;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routes agent modes to registered provider adapters
pub struct StaticProviderRouter {
    providers: HashMap<AgentMode, Arc<dyn ModelProvider>>,
    fallback: Option<Arc<dyn ModelProvider>>,
}

impl StaticProviderRouter {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            fallback: None,
        }
    }

    pub fn register(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.insert(provider.mode(), provider);
        self
    }

    /// Provider used for any mode without a dedicated adapter. Typically
    /// the LiteLLM gateway, which accepts arbitrary model ids.
    pub fn with_fallback(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }
}

impl Default for StaticProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRouter for StaticProviderRouter {
    fn provider_for(&self, mode: AgentMode) -> Result<&dyn ModelProvider, ProviderError> {
        if let Some(provider) = self.providers.get(&mode) {
            return Ok(provider.as_ref());
        }
        if let Some(fallback) = &self.fallback {
            debug!("No dedicated provider for {mode}, using fallback");
            return Ok(fallback.as_ref());
        }
        Err(ProviderError::ModeNotAvailable(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_application::ports::provider::{ProviderRequest, ProviderResult};
    use async_trait::async_trait;

    struct StubProvider(AgentMode);

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn mode(&self) -> AgentMode {
            self.0
        }

        async fn execute(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResult, ProviderError> {
            Ok(ProviderResult::new("ok", 0.0))
        }
    }

    #[test]
    fn test_dedicated_adapter_wins_over_fallback() {
        let router = StaticProviderRouter::new()
            .register(Arc::new(StubProvider(AgentMode::ClaudeCli)))
            .with_fallback(Arc::new(StubProvider(AgentMode::Litellm)));

        let provider = router.provider_for(AgentMode::ClaudeCli).unwrap();
        assert_eq!(provider.mode(), AgentMode::ClaudeCli);
    }

    #[test]
    fn test_unregistered_mode_falls_back() {
        let router = StaticProviderRouter::new()
            .with_fallback(Arc::new(StubProvider(AgentMode::Litellm)));

        let provider = router.provider_for(AgentMode::GeminiCli).unwrap();
        assert_eq!(provider.mode(), AgentMode::Litellm);
    }

    #[test]
    fn test_no_adapter_and_no_fallback_errors() {
        let router = StaticProviderRouter::new();
        let err = router.provider_for(AgentMode::OpenaiCodex).err().unwrap();
        assert!(matches!(err, ProviderError::ModeNotAvailable(_)));
    }
}
