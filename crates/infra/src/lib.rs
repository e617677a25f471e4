//! Infrastructure layer: lot registry, event store, clock, configuration.

pub mod clock;
pub mod config;
pub mod event_store;
pub mod registry;


pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use registry::{LotRegistry, NewCost, NewLot, NewSale, RegistryError};
