//! Append-only event store boundary.
//!
//! Lots are persisted as per-lot event streams. This module defines the
//! storage-agnostic abstraction plus an in-memory implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
