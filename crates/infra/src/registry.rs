//! Lot registry: the transactional boundary around every lot.
//!
//! The registry owns the set of lots and is the only way to mutate one. Every
//! mutation runs the same pipeline:
//!
//! ```text
//! Command
//!   ↓
//! 1. Authorize the actor (capability gate, before any lot is touched)
//!   ↓
//! 2. Lock the lot's slot (per-lot mutex; the index lock is released first)
//!   ↓
//! 3. Decide events (pure `Lot::handle`)
//!   ↓
//! 4. Fold them into a copy of the lot (rejects corrupt decisions up front)
//!   ↓
//! 5. Append to the event store (optimistic concurrency on the lot version)
//!   ↓
//! 6. Swap in the folded lot and extend the ledger index
//! ```
//!
//! Nothing is visible to readers until step 6, and step 6 cannot fail, so a
//! rejected command leaves both the lot and its stream untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use aquaerp_auth::{
    AuthzError, CapabilityLookup, CommandAuthorization, Permission, authorize,
    explain_authorization,
};
use aquaerp_core::{
    ActorId, Aggregate, AggregateRoot, DomainError, EntryId, ExpectedVersion, Money, Pounds,
};
use aquaerp_events::Command;
use aquaerp_lots::{
    ChangeState, CostEntry, CreateLot, HarvestEvent, InventoryTotals, Lot, LotCommand, LotEvent,
    LotFilter, LotId, LotPolicy, LotSnapshot, LotState, LotView, RecordCost, RecordHarvest,
    RecordSale, RescheduleHarvest, SaleEvent,
};

use crate::clock::Clock;
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Aggregate type recorded on every lot stream.
pub const LOT_AGGREGATE_TYPE: &str = "lots.lot";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("lot not found")]
    NotFound,

    #[error("forbidden: actor {actor_id} lacks permission '{permission}'")]
    Forbidden {
        actor_id: ActorId,
        permission: Permission,
    },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("lot is discarded")]
    LotDiscarded,

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("insufficient inventory: requested {requested} lb, available {available} lb")]
    InsufficientInventory { requested: Pounds, available: Pounds },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("event store: {0}")]
    Store(EventStoreError),

    #[error("lot lock poisoned")]
    LockPoisoned,
}

impl RegistryError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::NotFound => "not_found",
            RegistryError::Forbidden { .. } => "forbidden",
            RegistryError::InvalidTransition(_) => "invalid_transition",
            RegistryError::LotDiscarded => "lot_discarded",
            RegistryError::InvalidWeight(_) => "invalid_weight",
            RegistryError::InsufficientInventory { .. } => "insufficient_inventory",
            RegistryError::Validation(_) => "validation",
            RegistryError::InvariantViolation(_) => "invariant_violation",
            RegistryError::Conflict(_) => "conflict",
            RegistryError::Store(_) => "store",
            RegistryError::LockPoisoned => "lock_poisoned",
        }
    }
}

impl From<DomainError> for RegistryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => RegistryError::Validation(msg),
            DomainError::InvalidId(msg) => RegistryError::Validation(msg),
            DomainError::InvariantViolation(msg) => RegistryError::InvariantViolation(msg),
            DomainError::NotFound => RegistryError::NotFound,
            DomainError::Conflict(msg) => RegistryError::Conflict(msg),
            DomainError::InvalidTransition(msg) => RegistryError::InvalidTransition(msg),
            DomainError::LotDiscarded => RegistryError::LotDiscarded,
            DomainError::InvalidWeight(msg) => RegistryError::InvalidWeight(msg),
            DomainError::InsufficientInventory {
                requested,
                available,
            } => RegistryError::InsufficientInventory {
                requested,
                available,
            },
        }
    }
}

impl From<AuthzError> for RegistryError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden {
                actor_id,
                permission,
            } => RegistryError::Forbidden {
                actor_id,
                permission,
            },
        }
    }
}

impl From<EventStoreError> for RegistryError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => RegistryError::Conflict(msg),
            other => RegistryError::Store(other),
        }
    }
}

/// Input of `create_lot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLot {
    pub name: String,
    pub variety: String,
    pub start_date: NaiveDate,
    pub estimated_harvest_date: NaiveDate,
    #[serde(default)]
    pub production_cost: Money,
}

/// Input of `record_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub weight: Pounds,
    pub unit_price: Money,
    pub date: NaiveDate,
    pub counterparty: String,
}

/// Input of `record_cost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCost {
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub note: String,
}

/// One lot plus its back-reference index of ledger entries (append order).
#[derive(Debug)]
struct LotSlot {
    lot: Lot,
    initial_cost: Money,
    harvests: Vec<HarvestEvent>,
    sales: Vec<SaleEvent>,
    costs: Vec<CostEntry>,
}

impl LotSlot {
    fn new(lot: Lot) -> Self {
        Self {
            lot,
            initial_cost: Money::ZERO,
            harvests: Vec::new(),
            sales: Vec::new(),
            costs: Vec::new(),
        }
    }

    /// Fold events into a copy of the lot without touching the slot.
    fn fold(&self, events: &[LotEvent]) -> Result<Lot, DomainError> {
        let mut next = self.lot.clone();
        for event in events {
            next.apply(event)?;
        }
        Ok(next)
    }

    fn commit(&mut self, lot: Lot, events: Vec<LotEvent>) {
        self.lot = lot;
        for event in events {
            match event {
                LotEvent::LotCreated(e) => self.initial_cost = e.production_cost,
                LotEvent::HarvestRecorded(h) => self.harvests.push(h),
                LotEvent::SaleRecorded(s) => self.sales.push(s),
                LotEvent::CostRecorded(c) => self.costs.push(c),
                LotEvent::StateChanged(_) | LotEvent::HarvestRescheduled(_) => {}
            }
        }
    }
}

type SlotRef = Arc<Mutex<LotSlot>>;

fn lock_slot(slot: &Mutex<LotSlot>) -> Result<MutexGuard<'_, LotSlot>, RegistryError> {
    slot.lock().map_err(|_| RegistryError::LockPoisoned)
}

/// Owned registry of lots.
///
/// - `S`: event store every accepted command is appended to
/// - `L`: actor → capability lookup
/// - `C`: clock for date-dependent metrics and state-change stamps
pub struct LotRegistry<S, L, C> {
    store: S,
    capabilities: L,
    clock: C,
    policy: LotPolicy,
    lots: RwLock<HashMap<LotId, SlotRef>>,
}

impl<S, L, C> LotRegistry<S, L, C>
where
    S: EventStore,
    L: CapabilityLookup,
    C: Clock,
{
    pub fn new(store: S, capabilities: L, clock: C, policy: LotPolicy) -> Self {
        Self {
            store,
            capabilities,
            clock,
            policy,
            lots: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild a registry by replaying every lot stream in `store`.
    pub fn rehydrate(
        store: S,
        capabilities: L,
        clock: C,
        policy: LotPolicy,
    ) -> Result<Self, RegistryError> {
        let mut lots = HashMap::new();
        for aggregate_id in store.stream_ids()? {
            let stream = store.load_stream(aggregate_id)?;
            if stream
                .first()
                .is_some_and(|e| e.aggregate_type != LOT_AGGREGATE_TYPE)
            {
                debug!(aggregate_id = %aggregate_id, "skipping non-lot stream");
                continue;
            }
            let lot_id = LotId::new(aggregate_id);
            let slot = replay(lot_id, policy, &stream)?;
            lots.insert(lot_id, Arc::new(Mutex::new(slot)));
        }

        info!(lots = lots.len(), "registry rehydrated from event store");

        Ok(Self {
            store,
            capabilities,
            clock,
            policy,
            lots: RwLock::new(lots),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &LotPolicy {
        &self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ---- mutations -------------------------------------------------------

    pub fn create_lot(&self, new: NewLot, actor: ActorId) -> Result<LotView, RegistryError> {
        let command = LotCommand::CreateLot(CreateLot {
            lot_id: LotId::generate(),
            actor,
            name: new.name,
            variety: new.variety,
            start_date: new.start_date,
            estimated_harvest_date: new.estimated_harvest_date,
            production_cost: new.production_cost,
        });
        let (_, snapshot) = self.dispatch(&command)?;
        Ok(self.view(snapshot))
    }

    pub fn change_state(
        &self,
        lot_id: LotId,
        target: LotState,
        actor: ActorId,
    ) -> Result<LotView, RegistryError> {
        let command = LotCommand::ChangeState(ChangeState {
            lot_id,
            actor,
            target,
            on: self.clock.today(),
        });
        let (_, snapshot) = self.dispatch(&command)?;
        Ok(self.view(snapshot))
    }

    pub fn discard_lot(&self, lot_id: LotId, actor: ActorId) -> Result<LotView, RegistryError> {
        self.change_state(lot_id, LotState::Discarded, actor)
    }

    pub fn record_harvest(
        &self,
        lot_id: LotId,
        weight: Pounds,
        date: NaiveDate,
        actor: ActorId,
    ) -> Result<HarvestEvent, RegistryError> {
        let command = LotCommand::RecordHarvest(RecordHarvest {
            lot_id,
            actor,
            entry_id: EntryId::new(),
            weight,
            date,
        });
        let (events, _) = self.dispatch(&command)?;
        events
            .into_iter()
            .find_map(|e| match e {
                LotEvent::HarvestRecorded(h) => Some(h),
                _ => None,
            })
            .ok_or_else(|| RegistryError::InvariantViolation("harvest produced no entry".into()))
    }

    pub fn record_sale(
        &self,
        lot_id: LotId,
        sale: NewSale,
        actor: ActorId,
    ) -> Result<SaleEvent, RegistryError> {
        let command = LotCommand::RecordSale(RecordSale {
            lot_id,
            actor,
            entry_id: EntryId::new(),
            weight: sale.weight,
            unit_price: sale.unit_price,
            date: sale.date,
            counterparty: sale.counterparty,
        });
        let (events, _) = self.dispatch(&command)?;
        events
            .into_iter()
            .find_map(|e| match e {
                LotEvent::SaleRecorded(s) => Some(s),
                _ => None,
            })
            .ok_or_else(|| RegistryError::InvariantViolation("sale produced no entry".into()))
    }

    pub fn record_cost(
        &self,
        lot_id: LotId,
        cost: NewCost,
        actor: ActorId,
    ) -> Result<CostEntry, RegistryError> {
        let command = LotCommand::RecordCost(RecordCost {
            lot_id,
            actor,
            entry_id: EntryId::new(),
            amount: cost.amount,
            date: cost.date,
            note: cost.note,
        });
        let (events, _) = self.dispatch(&command)?;
        events
            .into_iter()
            .find_map(|e| match e {
                LotEvent::CostRecorded(c) => Some(c),
                _ => None,
            })
            .ok_or_else(|| RegistryError::InvariantViolation("cost produced no entry".into()))
    }

    pub fn update_estimated_harvest_date(
        &self,
        lot_id: LotId,
        estimated_harvest_date: NaiveDate,
        actor: ActorId,
    ) -> Result<LotView, RegistryError> {
        let command = LotCommand::RescheduleHarvest(RescheduleHarvest {
            lot_id,
            actor,
            estimated_harvest_date,
            on: self.clock.today(),
        });
        let (_, snapshot) = self.dispatch(&command)?;
        Ok(self.view(snapshot))
    }

    /// Run an already-built command through the pipeline.
    pub fn execute(&self, command: LotCommand) -> Result<Vec<LotEvent>, RegistryError> {
        self.dispatch(&command).map(|(events, _)| events)
    }

    // ---- reads -----------------------------------------------------------

    pub fn get_lot(&self, lot_id: LotId) -> Result<LotView, RegistryError> {
        let slot = self.slot(lot_id)?;
        let snapshot = lock_slot(&slot)?.lot.snapshot();
        debug!(lot_id = %lot_id, version = snapshot.version, "lot read");
        Ok(self.view(snapshot))
    }

    /// Lots matching `filter`, ordered by start date then id.
    pub fn list_lots(&self, filter: &LotFilter) -> Result<Vec<LotView>, RegistryError> {
        let slots: Vec<SlotRef> = self.index()?.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(slots.len());
        for slot in slots {
            let snapshot = lock_slot(&slot)?.lot.snapshot();
            if filter.matches(&snapshot) {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by_key(|s| (s.start_date, s.lot_id));

        debug!(matched = snapshots.len(), "lots listed");
        let today = self.clock.today();
        Ok(snapshots
            .into_iter()
            .map(|s| LotView::new(s, today))
            .collect())
    }

    pub fn harvests(&self, lot_id: LotId) -> Result<Vec<HarvestEvent>, RegistryError> {
        let slot = self.slot(lot_id)?;
        let guard = lock_slot(&slot)?;
        Ok(guard.harvests.clone())
    }

    pub fn sales(&self, lot_id: LotId) -> Result<Vec<SaleEvent>, RegistryError> {
        let slot = self.slot(lot_id)?;
        let guard = lock_slot(&slot)?;
        Ok(guard.sales.clone())
    }

    pub fn costs(&self, lot_id: LotId) -> Result<Vec<CostEntry>, RegistryError> {
        let slot = self.slot(lot_id)?;
        let guard = lock_slot(&slot)?;
        Ok(guard.costs.clone())
    }

    /// Recompute a lot's totals from its ledger entries and check them against
    /// the running totals.
    pub fn audit_lot(&self, lot_id: LotId) -> Result<InventoryTotals, RegistryError> {
        let slot = self.slot(lot_id)?;
        let guard = lock_slot(&slot)?;

        let recomputed = InventoryTotals::from_entries(
            guard.initial_cost,
            &guard.harvests,
            &guard.sales,
            &guard.costs,
        )?;
        let running = *guard.lot.totals();
        if recomputed != running {
            error!(
                lot_id = %lot_id,
                running = ?running,
                recomputed = ?recomputed,
                "ledger entries disagree with running totals"
            );
            return Err(RegistryError::InvariantViolation(format!(
                "running totals {running:?} differ from ledger {recomputed:?}"
            )));
        }

        debug!(lot_id = %lot_id, "lot audit passed");
        Ok(recomputed)
    }

    // ---- pipeline --------------------------------------------------------

    fn dispatch(&self, command: &LotCommand) -> Result<(Vec<LotEvent>, LotSnapshot), RegistryError> {
        let lot_id = command.lot_id();
        let result = self.authorize(command).and_then(|()| match command {
            LotCommand::CreateLot(_) => self.insert_new(command),
            _ => {
                let slot = self.slot(lot_id)?;
                let mut guard = lock_slot(&slot)?;
                self.decide_and_commit(&mut guard, command)
            }
        });

        match &result {
            Ok((events, snapshot)) => info!(
                lot_id = %lot_id,
                command = command.kind(),
                actor_id = %command.actor(),
                events = events.len(),
                state = %snapshot.state,
                version = snapshot.version,
                "command applied"
            ),
            Err(err) => warn!(
                lot_id = %lot_id,
                command = command.kind(),
                actor_id = %command.actor(),
                error = %err,
                "command rejected"
            ),
        }

        result
    }

    fn authorize(&self, command: &LotCommand) -> Result<(), RegistryError> {
        let principal = self.capabilities.resolve(command.actor());
        let required = command.required_permission();
        authorize(&principal, required).map_err(|err| {
            let explanation = explain_authorization(&principal, required);
            warn!(
                actor_id = %principal.actor_id,
                permission = %required,
                reason = %explanation.reason,
                "authorization denied"
            );
            RegistryError::from(err)
        })
    }

    fn insert_new(&self, command: &LotCommand) -> Result<(Vec<LotEvent>, LotSnapshot), RegistryError> {
        let lot_id = command.lot_id();
        if self.index()?.contains_key(&lot_id) {
            return Err(RegistryError::Conflict(format!("lot {lot_id} already exists")));
        }

        let mut slot = LotSlot::new(Lot::empty(lot_id, self.policy));
        let committed = self.decide_and_commit(&mut slot, command)?;

        // The stream append above already rejected a concurrent create of the same id.
        self.index_mut()?
            .insert(lot_id, Arc::new(Mutex::new(slot)));
        Ok(committed)
    }

    fn decide_and_commit(
        &self,
        slot: &mut LotSlot,
        command: &LotCommand,
    ) -> Result<(Vec<LotEvent>, LotSnapshot), RegistryError> {
        let events = slot.lot.handle(command)?;
        let next = slot.fold(&events)?;

        self.persist(slot.lot.id_typed(), slot.lot.version(), &events)?;

        slot.commit(next, events.clone());
        Ok((events, slot.lot.snapshot()))
    }

    fn persist(
        &self,
        lot_id: LotId,
        version: u64,
        events: &[LotEvent],
    ) -> Result<Vec<StoredEvent>, RegistryError> {
        let expected = match version {
            0 => ExpectedVersion::NoStream,
            v => ExpectedVersion::Exact(v),
        };
        let uncommitted = events
            .iter()
            .map(|event| {
                UncommittedEvent::from_typed(lot_id.0, LOT_AGGREGATE_TYPE, Uuid::now_v7(), event)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.store.append(uncommitted, expected)?)
    }

    // ---- index -----------------------------------------------------------

    fn index(&self) -> Result<RwLockReadGuard<'_, HashMap<LotId, SlotRef>>, RegistryError> {
        self.lots.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn index_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<LotId, SlotRef>>, RegistryError> {
        self.lots.write().map_err(|_| RegistryError::LockPoisoned)
    }

    fn slot(&self, lot_id: LotId) -> Result<SlotRef, RegistryError> {
        self.index()?
            .get(&lot_id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    fn view(&self, snapshot: LotSnapshot) -> LotView {
        LotView::new(snapshot, self.clock.today())
    }
}

/// Rebuild one lot slot from its stored stream.
fn replay(lot_id: LotId, policy: LotPolicy, stream: &[StoredEvent]) -> Result<LotSlot, RegistryError> {
    let mut slot = LotSlot::new(Lot::empty(lot_id, policy));
    let mut last = 0u64;

    for stored in stream {
        if stored.aggregate_id != lot_id.0 {
            return Err(RegistryError::InvariantViolation(format!(
                "stream {lot_id} contains an event of aggregate {}",
                stored.aggregate_id
            )));
        }
        if stored.sequence_number != last + 1 {
            return Err(RegistryError::InvariantViolation(format!(
                "stream {lot_id} is not contiguous (after {last} found {})",
                stored.sequence_number
            )));
        }
        last = stored.sequence_number;

        let event: LotEvent = serde_json::from_value(stored.payload.clone())
            .map_err(|e| RegistryError::Store(EventStoreError::Serialization(e.to_string())))?;
        let events = vec![event];
        let next = slot.fold(&events)?;
        slot.commit(next, events);
    }

    if !slot.lot.is_created() {
        return Err(RegistryError::InvariantViolation(format!(
            "stream {lot_id} has no creation event"
        )));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::event_store::InMemoryEventStore;
    use aquaerp_auth::{Capability, CapabilityDirectory};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lbs(s: &str) -> Pounds {
        s.parse().unwrap()
    }

    fn usd(s: &str) -> Money {
        s.parse().unwrap()
    }

    /// Store that refuses every append.
    struct ReadOnlyStore;

    impl EventStore for ReadOnlyStore {
        fn append(
            &self,
            _events: Vec<UncommittedEvent>,
            _expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            Err(EventStoreError::Unavailable("read-only".to_string()))
        }

        fn load_stream(
            &self,
            _aggregate_id: aquaerp_core::AggregateId,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            Ok(vec![])
        }

        fn stream_ids(&self) -> Result<Vec<aquaerp_core::AggregateId>, EventStoreError> {
            Ok(vec![])
        }
    }

    fn new_lot() -> NewLot {
        NewLot {
            name: "Pond 7".to_string(),
            variety: "Vannamei".to_string(),
            start_date: date(2024, 1, 10),
            estimated_harvest_date: date(2024, 4, 18),
            production_cost: usd("1000"),
        }
    }

    fn registry(
        owner: ActorId,
    ) -> LotRegistry<InMemoryEventStore, CapabilityDirectory, FixedClock> {
        LotRegistry::new(
            InMemoryEventStore::new(),
            CapabilityDirectory::new().with(owner, Capability::Owner),
            FixedClock::new(date(2024, 3, 10)),
            LotPolicy::default(),
        )
    }

    #[test]
    fn authorization_is_checked_before_lookup() {
        let owner = ActorId::new();
        let stranger = ActorId::new();
        let registry = registry(owner);

        let err = registry
            .change_state(LotId::generate(), LotState::ReadyToHarvest, stranger)
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let err = registry
            .change_state(LotId::generate(), LotState::ReadyToHarvest, owner)
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound);
    }

    #[test]
    fn created_lot_is_persisted_and_indexed() {
        let owner = ActorId::new();
        let registry = registry(owner);

        let view = registry.create_lot(new_lot(), owner).unwrap();
        assert_eq!(view.lot.state, LotState::Stocking);
        assert_eq!(view.lot.version, 1);
        assert_eq!(view.metrics.cycle_days, 60);

        let stream = registry.store().load_stream(view.lot.lot_id.0).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].aggregate_type, LOT_AGGREGATE_TYPE);
        assert_eq!(stream[0].event_type, "lots.lot.created");
        assert_eq!(registry.get_lot(view.lot.lot_id).unwrap(), view);
    }

    #[test]
    fn first_harvest_appends_entry_and_state_change() {
        let owner = ActorId::new();
        let registry = registry(owner);
        let lot_id = registry.create_lot(new_lot(), owner).unwrap().lot.lot_id;
        registry
            .change_state(lot_id, LotState::ReadyToHarvest, owner)
            .unwrap();

        let entry = registry
            .record_harvest(lot_id, lbs("500"), date(2024, 3, 9), owner)
            .unwrap();
        assert_eq!(entry.lot_id, lot_id);
        assert_eq!(registry.harvests(lot_id).unwrap(), vec![entry]);

        let stream = registry.store().load_stream(lot_id.0).unwrap();
        assert_eq!(
            stream.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
            vec![
                "lots.lot.created",
                "lots.lot.state_changed",
                "lots.harvest.recorded",
                "lots.lot.state_changed",
            ]
        );
        assert_eq!(registry.get_lot(lot_id).unwrap().lot.state, LotState::OnSale);
    }

    #[test]
    fn duplicate_create_through_execute_conflicts() {
        let owner = ActorId::new();
        let registry = registry(owner);
        let command = LotCommand::CreateLot(CreateLot {
            lot_id: LotId::generate(),
            actor: owner,
            name: "Pond 1".to_string(),
            variety: "Monodon".to_string(),
            start_date: date(2024, 1, 1),
            estimated_harvest_date: date(2024, 5, 1),
            production_cost: Money::ZERO,
        });

        assert_eq!(registry.execute(command.clone()).unwrap().len(), 1);
        let err = registry.execute(command).unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn failed_append_leaves_lot_unchanged() {
        let owner = ActorId::new();
        let registry = LotRegistry::new(
            ReadOnlyStore,
            CapabilityDirectory::new().with(owner, Capability::Owner),
            FixedClock::new(date(2024, 3, 10)),
            LotPolicy::default(),
        );

        let err = registry.create_lot(new_lot(), owner).unwrap_err();
        assert!(matches!(err, RegistryError::Store(EventStoreError::Unavailable(_))));
        assert!(registry.list_lots(&LotFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn audit_matches_running_totals() {
        let owner = ActorId::new();
        let registry = registry(owner);
        let lot_id = registry.create_lot(new_lot(), owner).unwrap().lot.lot_id;
        registry
            .change_state(lot_id, LotState::ReadyToHarvest, owner)
            .unwrap();
        registry
            .record_harvest(lot_id, lbs("320.5"), date(2024, 3, 1), owner)
            .unwrap();
        registry
            .record_sale(
                lot_id,
                NewSale {
                    weight: lbs("120.25"),
                    unit_price: usd("3.10"),
                    date: date(2024, 3, 2),
                    counterparty: "Mercado Central".to_string(),
                },
                owner,
            )
            .unwrap();
        registry
            .record_cost(
                lot_id,
                NewCost {
                    amount: usd("85.40"),
                    date: date(2024, 3, 3),
                    note: "feed".to_string(),
                },
                owner,
            )
            .unwrap();

        let totals = registry.audit_lot(lot_id).unwrap();
        assert_eq!(totals.harvested(), lbs("320.5"));
        assert_eq!(totals.sold(), lbs("120.25"));
        // 120.25 x 3.10 = 372.775, rounded half away from zero.
        assert_eq!(totals.revenue(), usd("372.78"));
        assert_eq!(totals.cost(), usd("1085.40"));
        assert_eq!(registry.costs(lot_id).unwrap().len(), 1);
        assert_eq!(registry.sales(lot_id).unwrap()[0].revenue, usd("372.78"));
    }

    #[test]
    fn reschedule_stamps_today_and_keeps_state() {
        let owner = ActorId::new();
        let registry = registry(owner);
        let lot_id = registry.create_lot(new_lot(), owner).unwrap().lot.lot_id;

        let view = registry
            .update_estimated_harvest_date(lot_id, date(2024, 3, 20), owner)
            .unwrap();
        assert_eq!(view.lot.estimated_harvest_date, date(2024, 3, 20));
        assert_eq!(view.lot.state, LotState::Stocking);
        assert_eq!(view.metrics.days_until_estimated_harvest, 10);

        let stream = registry.store().load_stream(lot_id.0).unwrap();
        assert_eq!(stream[1].occurred_on, date(2024, 3, 10));

        let err = registry
            .update_estimated_harvest_date(lot_id, date(2023, 12, 31), owner)
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn error_kinds_map_from_domain_errors() {
        let err = RegistryError::from(DomainError::insufficient_inventory(lbs("600"), lbs("500")));
        assert_eq!(
            err,
            RegistryError::InsufficientInventory {
                requested: lbs("600"),
                available: lbs("500"),
            }
        );
        assert_eq!(
            RegistryError::from(EventStoreError::Concurrency("stale".into())).kind(),
            "conflict"
        );
        assert_eq!(RegistryError::from(DomainError::LotDiscarded).kind(), "lot_discarded");
    }
}
