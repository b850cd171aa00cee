//! Configuration loading

mod file_config;
mod loader;

pub use file_config::{DispatchConfig, FileConfig, ProvidersConfig, RetryConfig};
pub use loader::ConfigLoader;
