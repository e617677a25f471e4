use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Capability granted to an actor by the external auth collaborator.
///
/// Closed set: unknown role strings are rejected at parse time instead of
/// silently granting nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Owner,
    Administrator,
    Harvester,
    Seller,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Owner,
        Capability::Administrator,
        Capability::Harvester,
        Capability::Seller,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Owner => "owner",
            Capability::Administrator => "administrator",
            Capability::Harvester => "harvester",
            Capability::Seller => "seller",
        }
    }

    /// Owner-level capabilities may run every lot operation.
    pub fn is_owner_level(&self) -> bool {
        matches!(self, Capability::Owner | Capability::Administrator)
    }

    pub fn grants(&self, permission: Permission) -> bool {
        match self {
            Capability::Owner | Capability::Administrator => true,
            Capability::Harvester => permission == Permission::RecordHarvest,
            Capability::Seller => permission == Permission::RecordSale,
        }
    }

    /// Permissions granted by this capability, in declaration order.
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.grants(*p))
            .collect()
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Capability::Owner),
            "administrator" | "admin" => Ok(Capability::Administrator),
            "harvester" => Ok(Capability::Harvester),
            "seller" => Ok(Capability::Seller),
            other => Err(format!("unknown capability '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harvester_and_seller_are_single_purpose() {
        assert_eq!(Capability::Harvester.permissions(), vec![Permission::RecordHarvest]);
        assert_eq!(Capability::Seller.permissions(), vec![Permission::RecordSale]);
    }

    #[test]
    fn owner_level_grants_everything() {
        for cap in [Capability::Owner, Capability::Administrator] {
            assert!(cap.is_owner_level());
            assert_eq!(cap.permissions(), Permission::ALL.to_vec());
        }
    }

    #[test]
    fn parses_admin_alias_and_rejects_unknown() {
        assert_eq!("Admin".parse::<Capability>(), Ok(Capability::Administrator));
        assert!("cook".parse::<Capability>().is_err());
    }
}
