//! Turn aggregate

pub mod entities;
