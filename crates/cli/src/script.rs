//! JSON scripts: named actors, lot aliases and an ordered list of registry steps.
//!
//! ```json
//! {
//!   "today": "2024-03-10",
//!   "actors": { "ana": ["owner"], "hugo": ["harvester"], "sam": ["seller"] },
//!   "steps": [
//!     { "op": "create_lot", "as": "ana", "lot": "pond7", "name": "Pond 7",
//!       "variety": "Vannamei", "start_date": "2024-01-10",
//!       "estimated_harvest_date": "2024-04-18", "production_cost": "1000" },
//!     { "op": "change_state", "as": "ana", "lot": "pond7", "target": "ready_to_harvest" },
//!     { "op": "record_harvest", "as": "hugo", "lot": "pond7", "weight": "500", "date": "2024-03-09" }
//!   ]
//! }
//! ```
//!
//! Actors not listed under `actors` exist but hold no capabilities. A rejected
//! step is reported and the script carries on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use aquaerp_auth::{Capability, CapabilityDirectory};
use aquaerp_core::{ActorId, Pounds};
use aquaerp_infra::{
    FixedClock, InMemoryEventStore, LedgerConfig, LotRegistry, NewCost, NewLot, NewSale,
    RegistryError,
};
use aquaerp_lots::{LotFilter, LotId, LotState, LotView};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid script JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("actor '{actor}': {reason}")]
    Capability { actor: String, reason: String },

    #[error("step {index} ({op}): lot '{alias}' is used before a create_lot step defines it")]
    UnknownLot {
        index: usize,
        op: &'static str,
        alias: String,
    },

    #[error("step {index}: lot '{alias}' is defined twice")]
    DuplicateLot { index: usize, alias: String },

    #[error("reading final lot views: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Business date the script starts on.
    pub today: NaiveDate,
    /// Actor name → capability names.
    #[serde(default)]
    pub actors: BTreeMap<String, Vec<String>>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreateLot {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        #[serde(flatten)]
        details: NewLot,
    },
    ChangeState {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        target: LotState,
    },
    DiscardLot {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
    },
    RecordHarvest {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        weight: Pounds,
        date: NaiveDate,
    },
    RecordSale {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        #[serde(flatten)]
        sale: NewSale,
    },
    RecordCost {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        #[serde(flatten)]
        cost: NewCost,
    },
    UpdateEstimatedHarvestDate {
        #[serde(rename = "as")]
        actor: String,
        lot: String,
        date: NaiveDate,
    },
    AuditLot {
        lot: String,
    },
    AdvanceClock {
        days: u64,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::CreateLot { .. } => "create_lot",
            Step::ChangeState { .. } => "change_state",
            Step::DiscardLot { .. } => "discard_lot",
            Step::RecordHarvest { .. } => "record_harvest",
            Step::RecordSale { .. } => "record_sale",
            Step::RecordCost { .. } => "record_cost",
            Step::UpdateEstimatedHarvestDate { .. } => "update_estimated_harvest_date",
            Step::AuditLot { .. } => "audit_lot",
            Step::AdvanceClock { .. } => "advance_clock",
        }
    }

    pub fn lot(&self) -> Option<&str> {
        match self {
            Step::CreateLot { lot, .. }
            | Step::ChangeState { lot, .. }
            | Step::DiscardLot { lot, .. }
            | Step::RecordHarvest { lot, .. }
            | Step::RecordSale { lot, .. }
            | Step::RecordCost { lot, .. }
            | Step::UpdateEstimatedHarvestDate { lot, .. }
            | Step::AuditLot { lot } => Some(lot),
            Step::AdvanceClock { .. } => None,
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LotReport {
    pub alias: String,
    #[serde(flatten)]
    pub view: LotView,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Business date after the last step.
    pub today: NaiveDate,
    pub steps: Vec<StepOutcome>,
    pub lots: Vec<LotReport>,
}

impl Report {
    pub fn rejected(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

impl Script {
    /// Parse and check that every lot alias is defined before use.
    pub fn parse(raw: &str) -> Result<Self, ScriptError> {
        let script: Script = serde_json::from_str(raw)?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<(), ScriptError> {
        for (actor, names) in &self.actors {
            for name in names {
                Capability::from_str(name).map_err(|reason| ScriptError::Capability {
                    actor: actor.clone(),
                    reason,
                })?;
            }
        }

        let mut defined = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::CreateLot { lot, .. } => {
                    if !defined.insert(lot.as_str()) {
                        return Err(ScriptError::DuplicateLot {
                            index,
                            alias: lot.clone(),
                        });
                    }
                }
                other => {
                    if let Some(alias) = other.lot() {
                        if !defined.contains(alias) {
                            return Err(ScriptError::UnknownLot {
                                index,
                                op: other.op(),
                                alias: alias.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Run every step through a fresh in-memory registry.
    pub fn run(&self, config: &LedgerConfig) -> Result<Report, ScriptError> {
        let mut runner = Runner::new(self, config)?;

        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let outcome = match runner.apply(step) {
                Ok(()) => {
                    debug!(step = index, op = step.op(), "step applied");
                    StepOutcome {
                        index,
                        op: step.op(),
                        lot: step.lot().map(str::to_string),
                        ok: true,
                        error: None,
                        message: None,
                    }
                }
                Err(err) => StepOutcome {
                    index,
                    op: step.op(),
                    lot: step.lot().map(str::to_string),
                    ok: false,
                    error: Some(err.kind()),
                    message: Some(err.to_string()),
                },
            };
            steps.push(outcome);
        }

        let report = runner.finish(steps)?;
        info!(
            steps = report.steps.len(),
            rejected = report.rejected(),
            lots = report.lots.len(),
            "script finished"
        );
        Ok(report)
    }
}

type ScriptRegistry = LotRegistry<InMemoryEventStore, CapabilityDirectory, Arc<FixedClock>>;

struct Runner {
    registry: ScriptRegistry,
    clock: Arc<FixedClock>,
    actors: HashMap<String, ActorId>,
    lots: HashMap<String, LotId>,
}

impl Runner {
    fn new(script: &Script, config: &LedgerConfig) -> Result<Self, ScriptError> {
        let directory = CapabilityDirectory::new();
        let mut actors = HashMap::new();
        for (name, capabilities) in &script.actors {
            let actor_id = ActorId::new();
            for capability in capabilities {
                let capability =
                    Capability::from_str(capability).map_err(|reason| ScriptError::Capability {
                        actor: name.clone(),
                        reason,
                    })?;
                directory.grant(actor_id, capability);
            }
            actors.insert(name.clone(), actor_id);
        }

        let clock = Arc::new(FixedClock::new(script.today));
        let registry = LotRegistry::new(
            InMemoryEventStore::new(),
            directory,
            clock.clone(),
            config.policy(),
        );

        Ok(Self {
            registry,
            clock,
            actors,
            lots: HashMap::new(),
        })
    }

    fn actor(&mut self, name: &str) -> ActorId {
        *self.actors.entry(name.to_string()).or_default()
    }

    /// A lot whose create step was rejected resolves to an id nobody holds.
    fn lot(&mut self, alias: &str) -> LotId {
        *self
            .lots
            .entry(alias.to_string())
            .or_insert_with(LotId::generate)
    }

    fn apply(&mut self, step: &Step) -> Result<(), RegistryError> {
        match step {
            Step::CreateLot {
                actor,
                lot,
                details,
            } => {
                let actor = self.actor(actor);
                let view = self.registry.create_lot(details.clone(), actor)?;
                self.lots.insert(lot.clone(), view.lot.lot_id);
            }
            Step::ChangeState { actor, lot, target } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry.change_state(lot, *target, actor)?;
            }
            Step::DiscardLot { actor, lot } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry.discard_lot(lot, actor)?;
            }
            Step::RecordHarvest {
                actor,
                lot,
                weight,
                date,
            } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry.record_harvest(lot, *weight, *date, actor)?;
            }
            Step::RecordSale { actor, lot, sale } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry.record_sale(lot, sale.clone(), actor)?;
            }
            Step::RecordCost { actor, lot, cost } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry.record_cost(lot, cost.clone(), actor)?;
            }
            Step::UpdateEstimatedHarvestDate { actor, lot, date } => {
                let (actor, lot) = (self.actor(actor), self.lot(lot));
                self.registry
                    .update_estimated_harvest_date(lot, *date, actor)?;
            }
            Step::AuditLot { lot } => {
                let lot = self.lot(lot);
                self.registry.audit_lot(lot)?;
            }
            Step::AdvanceClock { days } => self.clock.advance(*days),
        }
        Ok(())
    }

    fn finish(self, steps: Vec<StepOutcome>) -> Result<Report, ScriptError> {
        let aliases: HashMap<LotId, String> = self
            .lots
            .into_iter()
            .map(|(alias, id)| (id, alias))
            .collect();

        let everything = LotFilter {
            include_discarded: true,
            ..LotFilter::default()
        };
        let lots = self
            .registry
            .list_lots(&everything)?
            .into_iter()
            .map(|view| LotReport {
                alias: aliases
                    .get(&view.lot.lot_id)
                    .cloned()
                    .unwrap_or_else(|| view.lot.lot_id.to_string()),
                view,
            })
            .collect();

        Ok(Report {
            today: self.registry.today(),
            steps,
            lots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POND_SCRIPT: &str = r#"{
        "today": "2024-03-10",
        "actors": { "ana": ["owner"], "hugo": ["harvester"], "sam": ["seller"] },
        "steps": [
            { "op": "create_lot", "as": "ana", "lot": "pond7", "name": "Pond 7",
              "variety": "Vannamei", "start_date": "2024-01-10",
              "estimated_harvest_date": "2024-04-18", "production_cost": "1000" },
            { "op": "record_harvest", "as": "hugo", "lot": "pond7", "weight": "100", "date": "2024-03-01" },
            { "op": "change_state", "as": "ana", "lot": "pond7", "target": "ready_to_harvest" },
            { "op": "record_harvest", "as": "hugo", "lot": "pond7", "weight": "500", "date": "2024-03-09" },
            { "op": "record_sale", "as": "sam", "lot": "pond7", "weight": "600", "unit_price": "2.0",
              "date": "2024-03-10", "counterparty": "buyerX" },
            { "op": "record_sale", "as": "sam", "lot": "pond7", "weight": "-5", "unit_price": "2.0",
              "date": "2024-03-10", "counterparty": "buyerX" },
            { "op": "record_sale", "as": "sam", "lot": "pond7", "weight": "500", "unit_price": "2.0",
              "date": "2024-03-10", "counterparty": "buyerX" },
            { "op": "record_cost", "as": "ana", "lot": "pond7", "amount": "150", "date": "2024-03-10" },
            { "op": "change_state", "as": "ana", "lot": "pond7", "target": "resting" },
            { "op": "audit_lot", "lot": "pond7" },
            { "op": "advance_clock", "days": 5 }
        ]
    }"#;

    #[test]
    fn runs_the_pond_lifecycle() {
        let script = Script::parse(POND_SCRIPT).unwrap();
        let report = script.run(&LedgerConfig::default()).unwrap();

        let errors: Vec<Option<&str>> = report.steps.iter().map(|s| s.error).collect();
        assert_eq!(
            errors,
            vec![
                None,
                Some("invalid_transition"),
                None,
                None,
                Some("insufficient_inventory"),
                Some("invalid_weight"),
                None,
                None,
                None,
                None,
                None,
            ]
        );
        assert_eq!(report.rejected(), 3);

        assert_eq!(report.lots.len(), 1);
        let pond = &report.lots[0];
        assert_eq!(pond.alias, "pond7");
        assert_eq!(pond.view.lot.state, LotState::Resting);
        assert_eq!(pond.view.lot.revenue, "1000".parse().unwrap());
        assert_eq!(pond.view.lot.production_cost, "1150".parse().unwrap());
        assert_eq!(pond.view.metrics.cycle_days, 65);
        assert_eq!(report.today, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn undeclared_actors_are_forbidden() {
        let script = Script::parse(
            r#"{
                "today": "2024-03-10",
                "steps": [
                    { "op": "create_lot", "as": "mallory", "lot": "p", "name": "P",
                      "variety": "Vannamei", "start_date": "2024-01-10",
                      "estimated_harvest_date": "2024-04-18" },
                    { "op": "discard_lot", "as": "mallory", "lot": "p" }
                ]
            }"#,
        )
        .unwrap();

        let report = script.run(&LedgerConfig::default()).unwrap();
        assert!(report.steps.iter().all(|s| s.error == Some("forbidden")));
        assert!(report.lots.is_empty());
    }

    #[test]
    fn lots_used_before_creation_make_the_script_malformed() {
        let err = Script::parse(
            r#"{
                "today": "2024-03-10",
                "steps": [ { "op": "audit_lot", "lot": "ghost" } ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::UnknownLot { index: 0, .. }));
    }

    #[test]
    fn unknown_capabilities_make_the_script_malformed() {
        let err = Script::parse(
            r#"{ "today": "2024-03-10", "actors": { "x": ["janitor"] }, "steps": [] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::Capability { .. }));
    }

    #[test]
    fn demo_script_runs_to_a_rested_pond() {
        let script = Script::parse(include_str!("../../../demos/pond_season.json")).unwrap();
        let report = script.run(&LedgerConfig::default()).unwrap();

        let rejected: Vec<(usize, &str)> = report
            .steps
            .iter()
            .filter_map(|s| s.error.map(|e| (s.index, e)))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (5, "insufficient_inventory"),
                (7, "invalid_transition"),
                (8, "forbidden"),
            ]
        );

        let pond7 = report.lots.iter().find(|l| l.alias == "pond7").unwrap();
        assert_eq!(pond7.view.lot.state, LotState::Resting);
        // 320.5 x 2.35 = 753.175 -> 753.18, plus 179.5 x 2.10 = 376.95
        assert_eq!(pond7.view.lot.revenue, "1130.13".parse().unwrap());
        let pond3 = report.lots.iter().find(|l| l.alias == "pond3").unwrap();
        assert_eq!(
            pond3.view.lot.estimated_harvest_date,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
        );
    }

    #[test]
    fn report_serializes_flat_lot_views() {
        let report = Script::parse(POND_SCRIPT)
            .unwrap()
            .run(&LedgerConfig::default())
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["lots"][0]["alias"], "pond7");
        assert_eq!(json["lots"][0]["state"], "resting");
        assert!(json["lots"][0]["metrics"].is_object());
        assert_eq!(json["steps"][4]["error"], "insufficient_inventory");
        assert!(json["steps"][0].get("error").is_none());
    }
}
