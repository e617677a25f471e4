use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aquaerp_auth::{CommandAuthorization, Permission};
use aquaerp_core::{
    ActorId, Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, EntryId, Money,
    Pounds,
};
use aquaerp_events::{Command, Event};

use crate::{
    CostEntry, HarvestEvent, InventoryTotals, LotPolicy, LotSnapshot, LotState, SaleEvent, Trigger,
};

/// Lot identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(pub AggregateId);

impl LotId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for LotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for LotId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateId::from_str(s).map(Self)
    }
}

/// Aggregate root: Lot.
///
/// Holds lifecycle state and running totals only. The harvest/sale/cost
/// entries that produced the totals live in the lot's event stream and in the
/// registry's per-lot index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    id: LotId,
    name: String,
    variety: String,
    start_date: NaiveDate,
    estimated_harvest_date: NaiveDate,
    state: LotState,
    totals: InventoryTotals,
    policy: LotPolicy,
    version: u64,
    created: bool,
}

impl Lot {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LotId, policy: LotPolicy) -> Self {
        Self {
            id,
            name: String::new(),
            variety: String::new(),
            start_date: NaiveDate::MIN,
            estimated_harvest_date: NaiveDate::MIN,
            state: LotState::Stocking,
            totals: InventoryTotals::default(),
            policy,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LotId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variety(&self) -> &str {
        &self.variety
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn estimated_harvest_date(&self) -> NaiveDate {
        self.estimated_harvest_date
    }

    pub fn state(&self) -> LotState {
        self.state
    }

    pub fn totals(&self) -> &InventoryTotals {
        &self.totals
    }

    pub fn policy(&self) -> &LotPolicy {
        &self.policy
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn snapshot(&self) -> LotSnapshot {
        LotSnapshot {
            lot_id: self.id,
            name: self.name.clone(),
            variety: self.variety.clone(),
            start_date: self.start_date,
            estimated_harvest_date: self.estimated_harvest_date,
            state: self.state,
            harvested_weight: self.totals.harvested(),
            sold_weight: self.totals.sold(),
            production_cost: self.totals.cost(),
            revenue: self.totals.revenue(),
            version: self.version,
        }
    }
}

impl AggregateRoot for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateLot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLot {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub name: String,
    pub variety: String,
    pub start_date: NaiveDate,
    pub estimated_harvest_date: NaiveDate,
    pub production_cost: Money,
}

/// Command: ChangeState (explicit transitions only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeState {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub target: LotState,
    pub on: NaiveDate,
}

/// Command: RecordHarvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHarvest {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub entry_id: EntryId,
    pub weight: Pounds,
    pub date: NaiveDate,
}

/// Command: RecordSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub entry_id: EntryId,
    pub weight: Pounds,
    pub unit_price: Money,
    pub date: NaiveDate,
    pub counterparty: String,
}

/// Command: RecordCost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCost {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub entry_id: EntryId,
    pub amount: Money,
    pub date: NaiveDate,
    pub note: String,
}

/// Command: RescheduleHarvest (administrative date correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleHarvest {
    pub lot_id: LotId,
    pub actor: ActorId,
    pub estimated_harvest_date: NaiveDate,
    pub on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotCommand {
    CreateLot(CreateLot),
    ChangeState(ChangeState),
    RecordHarvest(RecordHarvest),
    RecordSale(RecordSale),
    RecordCost(RecordCost),
    RescheduleHarvest(RescheduleHarvest),
}

impl LotCommand {
    pub fn lot_id(&self) -> LotId {
        match self {
            LotCommand::CreateLot(c) => c.lot_id,
            LotCommand::ChangeState(c) => c.lot_id,
            LotCommand::RecordHarvest(c) => c.lot_id,
            LotCommand::RecordSale(c) => c.lot_id,
            LotCommand::RecordCost(c) => c.lot_id,
            LotCommand::RescheduleHarvest(c) => c.lot_id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LotCommand::CreateLot(_) => "create_lot",
            LotCommand::ChangeState(_) => "change_state",
            LotCommand::RecordHarvest(_) => "record_harvest",
            LotCommand::RecordSale(_) => "record_sale",
            LotCommand::RecordCost(_) => "record_cost",
            LotCommand::RescheduleHarvest(_) => "reschedule_harvest",
        }
    }
}

impl Command for LotCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        self.lot_id().0
    }

    fn actor(&self) -> ActorId {
        match self {
            LotCommand::CreateLot(c) => c.actor,
            LotCommand::ChangeState(c) => c.actor,
            LotCommand::RecordHarvest(c) => c.actor,
            LotCommand::RecordSale(c) => c.actor,
            LotCommand::RecordCost(c) => c.actor,
            LotCommand::RescheduleHarvest(c) => c.actor,
        }
    }
}

impl CommandAuthorization for LotCommand {
    fn required_permission(&self) -> Permission {
        match self {
            LotCommand::CreateLot(_) => Permission::CreateLot,
            LotCommand::ChangeState(c) if c.target == LotState::Discarded => Permission::DiscardLot,
            LotCommand::ChangeState(_) => Permission::ChangeState,
            LotCommand::RecordHarvest(_) => Permission::RecordHarvest,
            LotCommand::RecordSale(_) => Permission::RecordSale,
            LotCommand::RecordCost(_) => Permission::RecordCost,
            LotCommand::RescheduleHarvest(_) => Permission::UpdateSchedule,
        }
    }
}

/// Event: LotCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotCreated {
    pub lot_id: LotId,
    pub name: String,
    pub variety: String,
    pub start_date: NaiveDate,
    pub estimated_harvest_date: NaiveDate,
    pub production_cost: Money,
    pub created_by: ActorId,
    /// Rules the lot keeps for its whole life, whatever process replays it.
    #[serde(default)]
    pub policy: LotPolicy,
}

/// Event: StateChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    pub lot_id: LotId,
    pub from: LotState,
    pub to: LotState,
    pub trigger: Trigger,
    pub on: NaiveDate,
    pub changed_by: ActorId,
}

/// Event: HarvestRescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestRescheduled {
    pub lot_id: LotId,
    pub previous: NaiveDate,
    pub estimated_harvest_date: NaiveDate,
    pub on: NaiveDate,
    pub changed_by: ActorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotEvent {
    LotCreated(LotCreated),
    StateChanged(StateChanged),
    HarvestRecorded(HarvestEvent),
    SaleRecorded(SaleEvent),
    CostRecorded(CostEntry),
    HarvestRescheduled(HarvestRescheduled),
}

impl LotEvent {
    pub fn lot_id(&self) -> LotId {
        match self {
            LotEvent::LotCreated(e) => e.lot_id,
            LotEvent::StateChanged(e) => e.lot_id,
            LotEvent::HarvestRecorded(e) => e.lot_id,
            LotEvent::SaleRecorded(e) => e.lot_id,
            LotEvent::CostRecorded(e) => e.lot_id,
            LotEvent::HarvestRescheduled(e) => e.lot_id,
        }
    }
}

impl Event for LotEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LotEvent::LotCreated(_) => "lots.lot.created",
            LotEvent::StateChanged(_) => "lots.lot.state_changed",
            LotEvent::HarvestRecorded(_) => "lots.harvest.recorded",
            LotEvent::SaleRecorded(_) => "lots.sale.recorded",
            LotEvent::CostRecorded(_) => "lots.cost.recorded",
            LotEvent::HarvestRescheduled(_) => "lots.lot.harvest_rescheduled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_on(&self) -> NaiveDate {
        match self {
            LotEvent::LotCreated(e) => e.start_date,
            LotEvent::StateChanged(e) => e.on,
            LotEvent::HarvestRecorded(e) => e.date,
            LotEvent::SaleRecorded(e) => e.date,
            LotEvent::CostRecorded(e) => e.date,
            LotEvent::HarvestRescheduled(e) => e.on,
        }
    }
}

impl Aggregate for Lot {
    type Command = LotCommand;
    type Event = LotEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        if let LotEvent::LotCreated(e) = event {
            if self.created {
                return Err(DomainError::invariant("lot created twice"));
            }
            let totals = InventoryTotals::stocked(e.production_cost)?;
            self.id = e.lot_id;
            self.name = e.name.clone();
            self.variety = e.variety.clone();
            self.start_date = e.start_date;
            self.estimated_harvest_date = e.estimated_harvest_date;
            self.state = LotState::Stocking;
            self.totals = totals;
            self.policy = e.policy;
            self.created = true;
            self.version += 1;
            return Ok(());
        }

        if !self.created {
            return Err(DomainError::invariant("event applied before lot creation"));
        }
        if event.lot_id() != self.id {
            return Err(DomainError::invariant("event belongs to another lot"));
        }

        match event {
            LotEvent::StateChanged(e) => {
                if e.from != self.state {
                    return Err(DomainError::invariant(format!(
                        "state change from {} applied to lot in {}",
                        e.from, self.state
                    )));
                }
                self.state = e.to;
            }
            LotEvent::HarvestRecorded(e) => {
                self.totals = self.totals.with_harvest(e.weight)?;
            }
            LotEvent::SaleRecorded(e) => {
                self.totals = self.totals.with_sale(e.weight, e.revenue)?;
            }
            LotEvent::CostRecorded(e) => {
                self.totals = self.totals.with_cost(e.amount)?;
            }
            LotEvent::HarvestRescheduled(e) => {
                self.estimated_harvest_date = e.estimated_harvest_date;
            }
            LotEvent::LotCreated(_) => return Err(DomainError::invariant("lot created twice")),
        }

        self.version += 1;
        Ok(())
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LotCommand::CreateLot(cmd) => self.handle_create(cmd),
            LotCommand::ChangeState(cmd) => self.handle_change_state(cmd),
            LotCommand::RecordHarvest(cmd) => self.handle_harvest(cmd),
            LotCommand::RecordSale(cmd) => self.handle_sale(cmd),
            LotCommand::RecordCost(cmd) => self.handle_cost(cmd),
            LotCommand::RescheduleHarvest(cmd) => self.handle_reschedule(cmd),
        }
    }
}

impl Lot {
    /// Existence, identity and the discarded guard shared by every mutation.
    fn ensure_live(&self, lot_id: LotId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != lot_id {
            return Err(DomainError::invariant("lot_id mismatch"));
        }
        if self.state.is_terminal() {
            return Err(DomainError::LotDiscarded);
        }
        Ok(())
    }

    fn ensure_not_before_start(&self, date: NaiveDate, what: &str) -> DomainResult<()> {
        if date < self.start_date {
            return Err(DomainError::validation(format!(
                "{what} {date} precedes lot start date {}",
                self.start_date
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateLot) -> DomainResult<Vec<LotEvent>> {
        if self.created {
            return Err(DomainError::conflict("lot already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.variety.trim().is_empty() {
            return Err(DomainError::validation("variety cannot be empty"));
        }
        if cmd.estimated_harvest_date < cmd.start_date {
            return Err(DomainError::validation(
                "estimated harvest date cannot precede start date",
            ));
        }
        if cmd.production_cost.is_negative() {
            return Err(DomainError::invalid_weight(
                "production cost cannot be negative",
            ));
        }

        Ok(vec![LotEvent::LotCreated(LotCreated {
            lot_id: cmd.lot_id,
            name: cmd.name.trim().to_string(),
            variety: cmd.variety.trim().to_string(),
            start_date: cmd.start_date,
            estimated_harvest_date: cmd.estimated_harvest_date,
            production_cost: cmd.production_cost,
            created_by: cmd.actor,
            policy: self.policy,
        })])
    }

    fn handle_change_state(&self, cmd: &ChangeState) -> DomainResult<Vec<LotEvent>> {
        self.ensure_live(cmd.lot_id)?;

        let trigger = Trigger::for_target(cmd.target)?;
        let to = self.state.transition(trigger, self.totals.available())?;

        Ok(vec![LotEvent::StateChanged(StateChanged {
            lot_id: cmd.lot_id,
            from: self.state,
            to,
            trigger,
            on: cmd.on,
            changed_by: cmd.actor,
        })])
    }

    fn handle_harvest(&self, cmd: &RecordHarvest) -> DomainResult<Vec<LotEvent>> {
        self.ensure_live(cmd.lot_id)?;

        if !cmd.weight.is_positive() {
            return Err(DomainError::invalid_weight("harvest weight must be positive"));
        }

        let moves_on_sale = match self.state {
            LotState::ReadyToHarvest => true,
            LotState::OnSale if self.policy.allow_harvest_while_on_sale => false,
            state => {
                return Err(DomainError::invalid_transition(format!(
                    "cannot record a harvest while the lot is {state}"
                )));
            }
        };
        self.ensure_not_before_start(cmd.date, "harvest date")?;
        self.totals.with_harvest(cmd.weight)?;

        let mut events = vec![LotEvent::HarvestRecorded(HarvestEvent {
            entry_id: cmd.entry_id,
            lot_id: cmd.lot_id,
            date: cmd.date,
            weight: cmd.weight,
            recorded_by: cmd.actor,
        })];

        if moves_on_sale {
            let to = self
                .state
                .transition(Trigger::FirstHarvest, self.totals.available())?;
            events.push(LotEvent::StateChanged(StateChanged {
                lot_id: cmd.lot_id,
                from: self.state,
                to,
                trigger: Trigger::FirstHarvest,
                on: cmd.date,
                changed_by: cmd.actor,
            }));
        }

        Ok(events)
    }

    fn handle_sale(&self, cmd: &RecordSale) -> DomainResult<Vec<LotEvent>> {
        self.ensure_live(cmd.lot_id)?;

        if !cmd.weight.is_positive() {
            return Err(DomainError::invalid_weight("sale weight must be positive"));
        }
        if !cmd.unit_price.is_positive() {
            return Err(DomainError::invalid_weight("unit price must be positive"));
        }
        // Selling exactly what is left is always allowed so an off-increment
        // remainder cannot keep the lot from resting.
        let sells_out = cmd.weight == self.totals.available();
        if !sells_out && !cmd.weight.is_multiple_of(self.policy.sale_increment) {
            return Err(DomainError::invalid_weight(format!(
                "sale weight {} lb is not a multiple of {} lb",
                cmd.weight, self.policy.sale_increment
            )));
        }
        if cmd.counterparty.trim().is_empty() {
            return Err(DomainError::validation("counterparty cannot be empty"));
        }
        if self.state != LotState::OnSale {
            return Err(DomainError::invalid_transition(format!(
                "cannot record a sale while the lot is {}",
                self.state
            )));
        }

        let revenue = Money::extended(cmd.weight, cmd.unit_price, self.policy.money_scale)?;
        self.totals.with_sale(cmd.weight, revenue)?;

        Ok(vec![LotEvent::SaleRecorded(SaleEvent {
            entry_id: cmd.entry_id,
            lot_id: cmd.lot_id,
            date: cmd.date,
            weight: cmd.weight,
            unit_price: cmd.unit_price,
            revenue,
            counterparty: cmd.counterparty.trim().to_string(),
            recorded_by: cmd.actor,
        })])
    }

    fn handle_cost(&self, cmd: &RecordCost) -> DomainResult<Vec<LotEvent>> {
        self.ensure_live(cmd.lot_id)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::invalid_weight("cost amount must be positive"));
        }
        self.totals.with_cost(cmd.amount)?;

        Ok(vec![LotEvent::CostRecorded(CostEntry {
            entry_id: cmd.entry_id,
            lot_id: cmd.lot_id,
            date: cmd.date,
            amount: cmd.amount,
            note: cmd.note.trim().to_string(),
            recorded_by: cmd.actor,
        })])
    }

    fn handle_reschedule(&self, cmd: &RescheduleHarvest) -> DomainResult<Vec<LotEvent>> {
        self.ensure_live(cmd.lot_id)?;
        self.ensure_not_before_start(cmd.estimated_harvest_date, "estimated harvest date")?;

        Ok(vec![LotEvent::HarvestRescheduled(HarvestRescheduled {
            lot_id: cmd.lot_id,
            previous: self.estimated_harvest_date,
            estimated_harvest_date: cmd.estimated_harvest_date,
            on: cmd.on,
            changed_by: cmd.actor,
        })])
    }
}
