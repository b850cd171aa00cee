//! Core domain types shared across aggregates

pub mod error;
pub mod ids;
pub mod model;
