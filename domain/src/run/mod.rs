//! Run aggregate

pub mod entities;
pub mod stream;
