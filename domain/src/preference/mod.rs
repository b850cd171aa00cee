//! Preference aggregate

pub mod entities;
