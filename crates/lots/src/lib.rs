//! Aquaculture lot domain module (event-sourced).
//!
//! A lot is one production batch of shrimp, from stocking a pond to selling
//! the last pound. This crate holds its business rules as deterministic domain
//! logic (no IO, no locking, no storage):
//!
//! - [`state`]: the lifecycle state machine
//! - [`entries`]: immutable harvest/sale/cost ledger entries
//! - [`inventory`]: the running-totals accumulator and its invariants
//! - [`metrics`]: derived financial and inventory figures
//! - [`lot`]: the `Lot` aggregate tying them together

pub mod entries;
pub mod inventory;
pub mod lot;
pub mod metrics;
pub mod policy;
pub mod state;
pub mod view;

pub use entries::{CostEntry, HarvestEvent, SaleEvent};
pub use inventory::InventoryTotals;
pub use lot::{
    ChangeState, CreateLot, HarvestRescheduled, Lot, LotCommand, LotCreated, LotEvent, LotId,
    RecordCost, RecordHarvest, RecordSale, RescheduleHarvest, StateChanged,
};
pub use metrics::LotMetrics;
pub use policy::LotPolicy;
pub use state::{LotState, Trigger};
pub use view::{LotFilter, LotSnapshot, LotView};
