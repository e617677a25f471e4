use serde::{Deserialize, Serialize};

use aquaerp_core::Pounds;
use rust_decimal::Decimal;

/// Configurable rules a lot applies when deciding commands.
///
/// A lot is created under the process's policy and records it in its
/// `LotCreated` event, so a replayed lot keeps deciding by the rules it was
/// created under. Everything a decision produces (including the rounded
/// revenue of a sale) is also written into the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotPolicy {
    /// Sale weights must be exact multiples of this (non-positive disables the check).
    pub sale_increment: Pounds,
    /// Decimal places kept when computing sale revenue.
    pub money_scale: u32,
    /// Accept further harvests once the lot is already on sale.
    pub allow_harvest_while_on_sale: bool,
}

impl Default for LotPolicy {
    fn default() -> Self {
        Self {
            sale_increment: Pounds::new(Decimal::new(1, 2)),
            money_scale: 2,
            allow_harvest_while_on_sale: false,
        }
    }
}
