//! Ledger entry types.
//!
//! Entries are facts: created once by the matching record operation, never
//! updated or deleted. Each references its lot by id; the lot itself keeps only
//! running totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aquaerp_core::{ActorId, EntryId, Entity, Money, Pounds};

use crate::LotId;

/// Pounds taken out of the pond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestEvent {
    pub entry_id: EntryId,
    pub lot_id: LotId,
    pub date: NaiveDate,
    pub weight: Pounds,
    pub recorded_by: ActorId,
}

/// Pounds sold to a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub entry_id: EntryId,
    pub lot_id: LotId,
    pub date: NaiveDate,
    pub weight: Pounds,
    pub unit_price: Money,
    /// `weight × unit_price` rounded at decision time.
    pub revenue: Money,
    pub counterparty: String,
    pub recorded_by: ActorId,
}

/// Production cost booked against the lot (feed, labour, energy, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub entry_id: EntryId,
    pub lot_id: LotId,
    pub date: NaiveDate,
    pub amount: Money,
    pub note: String,
    pub recorded_by: ActorId,
}

impl Entity for HarvestEvent {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.entry_id
    }
}

impl Entity for SaleEvent {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.entry_id
    }
}

impl Entity for CostEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.entry_id
    }
}
