//! Persistence layer: records, the `EmailStore` trait, and the in-memory
//! reference backend.

pub mod memory;
pub mod records;
pub mod traits;

pub use memory::MemoryStore;
pub use records::{EmailRecord, EventStatus, PendingEvent, ThreadRecord};
pub use traits::EmailStore;
