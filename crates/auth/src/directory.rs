use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use aquaerp_core::ActorId;

use crate::{Capability, Principal};

/// Actor → capability lookup supplied by the external auth collaborator.
///
/// Actors the lookup does not know resolve to a principal with no
/// capabilities, which every permission check rejects.
pub trait CapabilityLookup: Send + Sync {
    fn capabilities(&self, actor_id: ActorId) -> BTreeSet<Capability>;

    fn resolve(&self, actor_id: ActorId) -> Principal {
        Principal::new(actor_id, self.capabilities(actor_id))
    }
}

impl<L> CapabilityLookup for Arc<L>
where
    L: CapabilityLookup + ?Sized,
{
    fn capabilities(&self, actor_id: ActorId) -> BTreeSet<Capability> {
        (**self).capabilities(actor_id)
    }
}

/// In-memory capability directory for tests, tools and single-process setups.
#[derive(Debug, Default)]
pub struct CapabilityDirectory {
    inner: RwLock<HashMap<ActorId, BTreeSet<Capability>>>,
}

impl CapabilityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, handy when wiring fixtures.
    pub fn with(self, actor_id: ActorId, capability: Capability) -> Self {
        self.grant(actor_id, capability);
        self
    }

    pub fn grant(&self, actor_id: ActorId, capability: Capability) {
        if let Ok(mut map) = self.inner.write() {
            map.entry(actor_id).or_default().insert(capability);
        }
    }

    pub fn revoke(&self, actor_id: ActorId, capability: Capability) {
        if let Ok(mut map) = self.inner.write() {
            if let Some(caps) = map.get_mut(&actor_id) {
                caps.remove(&capability);
                if caps.is_empty() {
                    map.remove(&actor_id);
                }
            }
        }
    }
}

impl CapabilityLookup for CapabilityDirectory {
    fn capabilities(&self, actor_id: ActorId) -> BTreeSet<Capability> {
        match self.inner.read() {
            Ok(map) => map.get(&actor_id).cloned().unwrap_or_default(),
            Err(_) => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permission;

    #[test]
    fn unknown_actor_resolves_without_capabilities() {
        let dir = CapabilityDirectory::new();
        let principal = dir.resolve(ActorId::new());
        assert!(principal.capabilities.is_empty());
        assert!(!principal.can(Permission::RecordSale));
    }

    #[test]
    fn grant_and_revoke() {
        let actor = ActorId::new();
        let dir = CapabilityDirectory::new()
            .with(actor, Capability::Seller)
            .with(actor, Capability::Harvester);
        assert_eq!(dir.capabilities(actor).len(), 2);

        dir.revoke(actor, Capability::Seller);
        assert!(dir.resolve(actor).has(Capability::Harvester));
        assert!(!dir.resolve(actor).has(Capability::Seller));

        dir.revoke(actor, Capability::Harvester);
        assert!(dir.capabilities(actor).is_empty());
    }
}
