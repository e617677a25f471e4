//! Read-side shapes of a lot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aquaerp_core::{Money, Pounds};

use crate::{LotId, LotMetrics, LotState};

/// Consistent copy of a lot's fields, taken under the lot's lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub lot_id: LotId,
    pub name: String,
    pub variety: String,
    pub start_date: NaiveDate,
    pub estimated_harvest_date: NaiveDate,
    pub state: LotState,
    pub harvested_weight: Pounds,
    pub sold_weight: Pounds,
    pub production_cost: Money,
    pub revenue: Money,
    pub version: u64,
}

/// What `get_lot` / `list_lots` hand out: the snapshot plus derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotView {
    #[serde(flatten)]
    pub lot: LotSnapshot,
    pub metrics: LotMetrics,
}

impl LotView {
    pub fn new(lot: LotSnapshot, today: NaiveDate) -> Self {
        let metrics = LotMetrics::compute(&lot, today);
        Self { lot, metrics }
    }
}

/// Filter for listing lots.
///
/// Discarded lots are hidden unless `include_discarded` is set or the filter
/// asks for the discarded state explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotFilter {
    pub state: Option<LotState>,
    /// Case-insensitive exact match.
    pub variety: Option<String>,
    #[serde(default)]
    pub include_discarded: bool,
}

impl LotFilter {
    pub fn in_state(state: LotState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn matches(&self, lot: &LotSnapshot) -> bool {
        if let Some(state) = self.state {
            if lot.state != state {
                return false;
            }
        } else if lot.state == LotState::Discarded && !self.include_discarded {
            return false;
        }

        match &self.variety {
            Some(variety) => lot.variety.trim().eq_ignore_ascii_case(variety.trim()),
            None => true,
        }
    }
}
