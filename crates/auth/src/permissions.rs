use serde::{Deserialize, Serialize};

/// An operation on the lot ledger that requires authorization.
///
/// Reads are not listed: the ledger's read side is open to any caller that
/// reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateLot,
    ChangeState,
    DiscardLot,
    UpdateSchedule,
    RecordHarvest,
    RecordSale,
    RecordCost,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::CreateLot,
        Permission::ChangeState,
        Permission::DiscardLot,
        Permission::UpdateSchedule,
        Permission::RecordHarvest,
        Permission::RecordSale,
        Permission::RecordCost,
    ];

    /// Stable dotted name, used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateLot => "lots.create",
            Permission::ChangeState => "lots.state.change",
            Permission::DiscardLot => "lots.discard",
            Permission::UpdateSchedule => "lots.schedule.update",
            Permission::RecordHarvest => "lots.harvest.record",
            Permission::RecordSale => "lots.sale.record",
            Permission::RecordCost => "lots.cost.record",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
