//! Infrastructure layer for codearena
//!
//! Adapters behind the application layer's ports: the in-memory record
//! store, the broadcast streaming gateway, the model provider backends
//! (CLI agents and HTTP gateways), configuration loading, and the JSONL
//! run logger.

pub mod config;
pub mod logging;
pub mod providers;
pub mod store;
pub mod stream;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use logging::JsonlRunLogger;
pub use providers::{CliAgentProvider, HttpGatewayProvider, StaticProviderRouter};
pub use store::InMemoryRecordStore;
pub use stream::{BroadcastStreamGateway, FanoutGateway};
