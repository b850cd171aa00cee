//! Streaming gateway adapters

mod broadcast;

pub use broadcast::{BroadcastStreamGateway, FanoutGateway};
