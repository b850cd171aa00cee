//! Ports (abstract interfaces) consumed by the use cases.
//!
//! Implementations (adapters) live in the infrastructure layer.

pub mod provider;
pub mod record_store;
pub mod stream_gateway;
