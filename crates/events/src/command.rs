use aquaerp_core::{ActorId, AggregateId};

/// A command targets a specific aggregate.
///
/// Commands represent **intent** ("sell 200 lb from lot L"); they are either
/// rejected or turned into events, which are the persisted facts.
///
/// The target aggregate id is the unit of mutual exclusion: the registry
/// serializes all commands that share a target and runs commands for
/// different targets in parallel.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;

    /// The actor on whose behalf the command runs.
    fn actor(&self) -> ActorId;
}
