//! Financial aggregator: figures derived from a lot's current totals.
//!
//! Nothing here is stored. Metrics are recomputed on every read from the
//! snapshot, which is the single source of truth.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use aquaerp_core::{Money, Pounds};

use crate::view::LotSnapshot;

/// Decimal places kept for percentages and the average sale price.
const METRIC_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotMetrics {
    pub available_inventory: Pounds,
    /// `sold / harvested * 100`; 0 before the first harvest.
    pub sell_through_pct: Decimal,
    pub gross_profit: Money,
    /// `gross_profit / cost * 100`; 0 while no cost is booked.
    pub margin_pct: Decimal,
    /// `revenue / sold`; 0 before the first sale.
    pub average_sale_price: Money,
    /// Days since stocking; 0 when the start date is still ahead.
    pub cycle_days: i64,
    /// Negative once the estimated harvest date has passed.
    pub days_until_estimated_harvest: i64,
}

impl LotMetrics {
    pub fn compute(lot: &LotSnapshot, today: NaiveDate) -> Self {
        let harvested = lot.harvested_weight.value();
        let sold = lot.sold_weight.value();
        let revenue = lot.revenue.value();
        let cost = lot.production_cost.value();

        let gross_profit = revenue - cost;

        Self {
            available_inventory: Pounds::new(harvested - sold),
            sell_through_pct: percent(sold, harvested),
            gross_profit: Money::new(gross_profit),
            margin_pct: percent(gross_profit, cost),
            average_sale_price: Money::new(ratio(revenue, sold)),
            cycle_days: (today - lot.start_date).num_days().max(0),
            days_until_estimated_harvest: (lot.estimated_harvest_date - today).num_days(),
        }
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(METRIC_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .map(round)
        .unwrap_or(Decimal::ZERO)
}

fn percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(denominator))
        .map(round)
        .unwrap_or(Decimal::ZERO)
}
