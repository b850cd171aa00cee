//! Session aggregate

pub mod entities;
