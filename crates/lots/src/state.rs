//! Lot lifecycle state machine.
//!
//! ```text
//! Stocking --MarkReady--> ReadyToHarvest --FirstHarvest--> OnSale --Rest--> Resting
//!     \___________________________\___________________________\____________\__Discard--> Discarded
//! ```
//!
//! `Rest` is guarded: only a lot with no unsold pounds may rest. `Discarded`
//! is absorbing.

use serde::{Deserialize, Serialize};

use aquaerp_core::{DomainError, DomainResult, Pounds};

/// Lifecycle state of a lot. A lot is in exactly one state at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotState {
    Stocking,
    ReadyToHarvest,
    OnSale,
    Resting,
    Discarded,
}

/// What asks the state machine to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Explicit: the pond is ready to be harvested.
    MarkReady,
    /// Automatic: the first harvest was recorded.
    FirstHarvest,
    /// Explicit: everything harvested has been sold; the pond rests.
    Rest,
    /// Explicit: logical deletion.
    Discard,
}

impl LotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotState::Stocking => "stocking",
            LotState::ReadyToHarvest => "ready_to_harvest",
            LotState::OnSale => "on_sale",
            LotState::Resting => "resting",
            LotState::Discarded => "discarded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LotState::Discarded)
    }

    /// Apply `trigger` to this state.
    ///
    /// `available` is the lot's unsold inventory, needed by the `Rest` guard.
    /// On error the caller's state is, by construction, unchanged.
    pub fn transition(self, trigger: Trigger, available: Pounds) -> DomainResult<LotState> {
        match (self, trigger) {
            (LotState::Discarded, _) => Err(DomainError::LotDiscarded),
            (LotState::Stocking, Trigger::MarkReady) => Ok(LotState::ReadyToHarvest),
            (LotState::ReadyToHarvest, Trigger::FirstHarvest) => Ok(LotState::OnSale),
            (LotState::OnSale, Trigger::Rest) if available.is_zero() => Ok(LotState::Resting),
            (LotState::OnSale, Trigger::Rest) => Err(DomainError::invalid_transition(format!(
                "cannot rest a lot with {available} lb unsold"
            ))),
            (_, Trigger::Discard) => Ok(LotState::Discarded),
            (from, trigger) => Err(DomainError::invalid_transition(format!(
                "{trigger} is not allowed from {from}"
            ))),
        }
    }
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::MarkReady => "mark_ready",
            Trigger::FirstHarvest => "first_harvest",
            Trigger::Rest => "rest",
            Trigger::Discard => "discard",
        }
    }

    /// The explicit trigger that moves a lot into `target`.
    ///
    /// `Stocking` is only ever an initial state and `OnSale` is only reached
    /// through a harvest, so neither can be requested.
    pub fn for_target(target: LotState) -> DomainResult<Trigger> {
        match target {
            LotState::ReadyToHarvest => Ok(Trigger::MarkReady),
            LotState::Resting => Ok(Trigger::Rest),
            LotState::Discarded => Ok(Trigger::Discard),
            LotState::Stocking | LotState::OnSale => Err(DomainError::invalid_transition(
                format!("{target} cannot be requested explicitly"),
            )),
        }
    }
}

impl core::fmt::Display for LotState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Trigger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [LotState; 5] = [
        LotState::Stocking,
        LotState::ReadyToHarvest,
        LotState::OnSale,
        LotState::Resting,
        LotState::Discarded,
    ];

    const ALL_TRIGGERS: [Trigger; 4] = [
        Trigger::MarkReady,
        Trigger::FirstHarvest,
        Trigger::Rest,
        Trigger::Discard,
    ];

    fn lb(s: &str) -> Pounds {
        s.parse().unwrap()
    }

    #[test]
    fn legal_transitions() {
        let none = Pounds::ZERO;
        assert_eq!(
            LotState::Stocking.transition(Trigger::MarkReady, none),
            Ok(LotState::ReadyToHarvest)
        );
        assert_eq!(
            LotState::ReadyToHarvest.transition(Trigger::FirstHarvest, none),
            Ok(LotState::OnSale)
        );
        assert_eq!(LotState::OnSale.transition(Trigger::Rest, none), Ok(LotState::Resting));
    }

    #[test]
    fn rest_requires_empty_inventory() {
        let err = LotState::OnSale.transition(Trigger::Rest, lb("12.5")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(msg) if msg.contains("12.5")));
    }

    #[test]
    fn discard_is_reachable_from_every_live_state() {
        for state in ALL_STATES.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(
                state.transition(Trigger::Discard, lb("10")),
                Ok(LotState::Discarded)
            );
        }
    }

    #[test]
    fn discarded_is_absorbing() {
        for trigger in ALL_TRIGGERS {
            assert_eq!(
                LotState::Discarded.transition(trigger, Pounds::ZERO),
                Err(DomainError::LotDiscarded)
            );
        }
    }

    #[test]
    fn only_listed_pairs_are_legal() {
        let legal = [
            (LotState::Stocking, Trigger::MarkReady),
            (LotState::ReadyToHarvest, Trigger::FirstHarvest),
            (LotState::OnSale, Trigger::Rest),
        ];
        for state in ALL_STATES {
            for trigger in ALL_TRIGGERS {
                let result = state.transition(trigger, Pounds::ZERO);
                let expected_ok = legal.contains(&(state, trigger))
                    || (trigger == Trigger::Discard && !state.is_terminal());
                assert_eq!(result.is_ok(), expected_ok, "{state} --{trigger}-->");
            }
        }
    }

    #[test]
    fn explicit_targets() {
        assert_eq!(Trigger::for_target(LotState::ReadyToHarvest), Ok(Trigger::MarkReady));
        assert_eq!(Trigger::for_target(LotState::Resting), Ok(Trigger::Rest));
        assert_eq!(Trigger::for_target(LotState::Discarded), Ok(Trigger::Discard));
        assert!(matches!(
            Trigger::for_target(LotState::OnSale),
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(matches!(
            Trigger::for_target(LotState::Stocking),
            Err(DomainError::InvalidTransition(_))
        ));
    }
}
