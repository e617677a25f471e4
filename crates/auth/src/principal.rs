use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use aquaerp_core::ActorId;

use crate::{Capability, Permission};

/// A resolved actor: identity plus the capabilities it holds right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub actor_id: ActorId,
    pub capabilities: BTreeSet<Capability>,
}

impl Principal {
    pub fn new(actor_id: ActorId, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            actor_id,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.capabilities.iter().any(|c| c.grants(permission))
    }
}
