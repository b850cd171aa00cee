//! Run event logging

mod jsonl_logger;

pub use jsonl_logger::JsonlRunLogger;
