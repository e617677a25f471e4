//! Inventory accumulator: folds ledger entries into a lot's running totals.
//!
//! Totals are a value type. Every fold returns a *new* `InventoryTotals` after
//! checking the invariants, so a rejected fold can never leave a lot half
//! updated:
//!
//! - `0 <= sold <= harvested`
//! - `revenue >= 0`, `cost >= 0`
//!
//! Each total is a plain decimal sum over one kind of entry, so the result of
//! folding a set of entries does not depend on the order they arrive in.

use serde::{Deserialize, Serialize};

use aquaerp_core::{DomainError, DomainResult, Money, Pounds};

use crate::entries::{CostEntry, HarvestEvent, SaleEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTotals {
    harvested: Pounds,
    sold: Pounds,
    revenue: Money,
    cost: Money,
}

impl InventoryTotals {
    /// Totals of a freshly stocked lot with an initial production cost.
    pub fn stocked(initial_cost: Money) -> DomainResult<Self> {
        let totals = Self {
            cost: initial_cost,
            ..Self::default()
        };
        totals.validate()?;
        Ok(totals)
    }

    /// Recompute totals from scratch out of the lot's ledger entries.
    pub fn from_entries(
        initial_cost: Money,
        harvests: &[HarvestEvent],
        sales: &[SaleEvent],
        costs: &[CostEntry],
    ) -> DomainResult<Self> {
        let harvested = harvests
            .iter()
            .try_fold(Pounds::ZERO, |acc, h| acc.checked_add(h.weight))?;
        let sold = sales
            .iter()
            .try_fold(Pounds::ZERO, |acc, s| acc.checked_add(s.weight))?;
        let revenue = sales
            .iter()
            .try_fold(Money::ZERO, |acc, s| acc.checked_add(s.revenue))?;
        let cost = costs
            .iter()
            .try_fold(initial_cost, |acc, c| acc.checked_add(c.amount))?;

        let totals = Self {
            harvested,
            sold,
            revenue,
            cost,
        };
        totals.validate()?;
        Ok(totals)
    }

    pub fn harvested(&self) -> Pounds {
        self.harvested
    }

    pub fn sold(&self) -> Pounds {
        self.sold
    }

    pub fn revenue(&self) -> Money {
        self.revenue
    }

    pub fn cost(&self) -> Money {
        self.cost
    }

    /// Harvested but not yet sold.
    pub fn available(&self) -> Pounds {
        // Cannot overflow: both sides are non-negative.
        Pounds::new(self.harvested.value() - self.sold.value())
    }

    pub fn ensure_available(&self, weight: Pounds) -> DomainResult<()> {
        let available = self.available();
        if weight > available {
            return Err(DomainError::insufficient_inventory(weight, available));
        }
        Ok(())
    }

    pub fn with_harvest(&self, weight: Pounds) -> DomainResult<Self> {
        if !weight.is_positive() {
            return Err(DomainError::invalid_weight("harvest weight must be positive"));
        }
        let next = Self {
            harvested: self.harvested.checked_add(weight)?,
            ..*self
        };
        next.validate()?;
        Ok(next)
    }

    pub fn with_sale(&self, weight: Pounds, revenue: Money) -> DomainResult<Self> {
        if !weight.is_positive() {
            return Err(DomainError::invalid_weight("sale weight must be positive"));
        }
        if revenue.is_negative() {
            return Err(DomainError::invalid_weight("sale revenue cannot be negative"));
        }
        self.ensure_available(weight)?;
        let next = Self {
            sold: self.sold.checked_add(weight)?,
            revenue: self.revenue.checked_add(revenue)?,
            ..*self
        };
        next.validate()?;
        Ok(next)
    }

    pub fn with_cost(&self, amount: Money) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_weight("cost amount must be positive"));
        }
        let next = Self {
            cost: self.cost.checked_add(amount)?,
            ..*self
        };
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.harvested.is_negative() {
            return Err(DomainError::invariant("harvested weight cannot be negative"));
        }
        if self.sold.is_negative() {
            return Err(DomainError::invariant("sold weight cannot be negative"));
        }
        if self.sold > self.harvested {
            return Err(DomainError::invariant(format!(
                "sold weight {} exceeds harvested weight {}",
                self.sold, self.harvested
            )));
        }
        if self.revenue.is_negative() {
            return Err(DomainError::invariant("revenue cannot be negative"));
        }
        if self.cost.is_negative() {
            return Err(DomainError::invariant("cost cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn lb(s: &str) -> Pounds {
        s.parse().unwrap()
    }

    fn usd(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn stocked_lot_starts_empty() {
        let totals = InventoryTotals::stocked(usd("1000")).unwrap();
        assert_eq!(totals.harvested(), Pounds::ZERO);
        assert_eq!(totals.sold(), Pounds::ZERO);
        assert_eq!(totals.revenue(), Money::ZERO);
        assert_eq!(totals.cost(), usd("1000"));
    }

    #[test]
    fn negative_initial_cost_is_rejected() {
        assert!(InventoryTotals::stocked(usd("-1")).is_err());
    }

    #[test]
    fn sale_beyond_available_is_rejected_and_totals_unchanged() {
        let totals = InventoryTotals::default().with_harvest(lb("500")).unwrap();
        let err = totals.with_sale(lb("600"), usd("1200")).unwrap_err();
        assert_eq!(err, DomainError::insufficient_inventory(lb("600"), lb("500")));
        assert_eq!(totals.sold(), Pounds::ZERO);
        assert_eq!(totals.available(), lb("500"));
    }

    #[test]
    fn selling_everything_leaves_nothing_available() {
        let totals = InventoryTotals::default()
            .with_harvest(lb("500"))
            .unwrap()
            .with_sale(lb("500"), usd("1000"))
            .unwrap();
        assert!(totals.available().is_zero());
        assert_eq!(totals.revenue(), usd("1000"));
    }

    #[test]
    fn non_positive_quantities_are_invalid_weights() {
        let totals = InventoryTotals::default();
        assert!(matches!(totals.with_harvest(lb("0")), Err(DomainError::InvalidWeight(_))));
        assert!(matches!(totals.with_harvest(lb("-5")), Err(DomainError::InvalidWeight(_))));
        assert!(matches!(totals.with_cost(usd("0")), Err(DomainError::InvalidWeight(_))));
        assert!(matches!(
            totals.with_sale(lb("-5"), usd("1")),
            Err(DomainError::InvalidWeight(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of accepted folds ever breaks `sold <= harvested`.
        #[test]
        fn sold_never_exceeds_harvested(
            ops in prop::collection::vec((any::<bool>(), 1i64..100_000i64), 1..40)
        ) {
            let mut totals = InventoryTotals::default();
            for (is_sale, hundredths) in ops {
                let weight = Pounds::new(Decimal::new(hundredths, 2));
                let next = if is_sale {
                    totals.with_sale(weight, Money::new(Decimal::new(hundredths * 3, 2)))
                } else {
                    totals.with_harvest(weight)
                };
                if let Ok(next) = next {
                    totals = next;
                }
                prop_assert!(totals.sold() <= totals.harvested());
                prop_assert!(!totals.sold().is_negative());
            }
        }
    }
}
