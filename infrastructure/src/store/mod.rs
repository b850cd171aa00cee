//! Record store adapters

mod memory;

pub use memory::InMemoryRecordStore;
