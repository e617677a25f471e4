//! Configuration loading and representation.
//!
//! Ledger rules come from environment variables with safe defaults:
//!
//! | variable | default |
//! |---|---|
//! | `AQUAERP_SALE_INCREMENT` | `0.01` (lb) |
//! | `AQUAERP_MONEY_SCALE` | `2` |
//! | `AQUAERP_ALLOW_HARVEST_WHILE_ON_SALE` | `false` |

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use aquaerp_core::Pounds;
use aquaerp_lots::LotPolicy;

pub const SALE_INCREMENT_VAR: &str = "AQUAERP_SALE_INCREMENT";
pub const MONEY_SCALE_VAR: &str = "AQUAERP_MONEY_SCALE";
pub const ALLOW_HARVEST_WHILE_ON_SALE_VAR: &str = "AQUAERP_ALLOW_HARVEST_WHILE_ON_SALE";

/// Largest scale `rust_decimal` can represent.
const MAX_MONEY_SCALE: u32 = 28;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide ledger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub sale_increment: Pounds,
    pub money_scale: u32,
    pub allow_harvest_while_on_sale: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let policy = LotPolicy::default();
        Self {
            sale_increment: policy.sale_increment,
            money_scale: policy.money_scale,
            allow_harvest_while_on_sale: policy.allow_harvest_while_on_sale,
        }
    }
}

impl LedgerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup (unset keys use defaults).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |var: &'static str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sale_increment = match read(SALE_INCREMENT_VAR) {
            Some(value) => {
                let parsed = Pounds::from_str(&value).map_err(|e| ConfigError::Invalid {
                    var: SALE_INCREMENT_VAR,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
                if parsed.is_negative() {
                    return Err(ConfigError::Invalid {
                        var: SALE_INCREMENT_VAR,
                        value,
                        reason: "must not be negative".to_string(),
                    });
                }
                parsed
            }
            None => defaults.sale_increment,
        };

        let money_scale = match read(MONEY_SCALE_VAR) {
            Some(value) => {
                let parsed = value.parse::<u32>().map_err(|e| ConfigError::Invalid {
                    var: MONEY_SCALE_VAR,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
                if parsed > MAX_MONEY_SCALE {
                    return Err(ConfigError::Invalid {
                        var: MONEY_SCALE_VAR,
                        value,
                        reason: format!("must be at most {MAX_MONEY_SCALE}"),
                    });
                }
                parsed
            }
            None => defaults.money_scale,
        };

        let allow_harvest_while_on_sale = match read(ALLOW_HARVEST_WHILE_ON_SALE_VAR) {
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::Invalid {
                var: ALLOW_HARVEST_WHILE_ON_SALE_VAR,
                value: value.clone(),
                reason: "expected true/false".to_string(),
            })?,
            None => defaults.allow_harvest_while_on_sale,
        };

        Ok(Self {
            sale_increment,
            money_scale,
            allow_harvest_while_on_sale,
        })
    }

    pub fn policy(&self) -> LotPolicy {
        LotPolicy {
            sale_increment: self.sale_increment,
            money_scale: self.money_scale,
            allow_harvest_while_on_sale: self.allow_harvest_while_on_sale,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
