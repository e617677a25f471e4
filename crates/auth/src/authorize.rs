use serde::Serialize;
use thiserror::Error;

use aquaerp_core::ActorId;

use crate::{Capability, Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: actor {actor_id} lacks permission '{permission}'")]
    Forbidden {
        actor_id: ActorId,
        permission: Permission,
    },
}

/// Command-side authorization contract.
///
/// Implemented by commands so the registry can gate them uniformly before any
/// lot state is touched.
pub trait CommandAuthorization {
    fn required_permission(&self) -> Permission;
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No lot state (pure policy check)
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), AuthzError> {
    if principal.can(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            actor_id: principal.actor_id,
            permission: required,
        })
    }
}

/// Why an authorization decision came out the way it did.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub actor_id: ActorId,
    pub required_permission: Permission,
    pub granted: bool,
    pub reason: String,
    /// Capabilities the actor holds.
    pub capabilities: Vec<Capability>,
    /// Capabilities that would have granted the permission.
    pub granting_capabilities: Vec<Capability>,
}

/// Explain an authorization decision (for audit logs).
pub fn explain_authorization(
    principal: &Principal,
    required: Permission,
) -> AuthorizationExplanation {
    let capabilities: Vec<Capability> = principal.capabilities.iter().copied().collect();
    let granting_capabilities: Vec<Capability> = Capability::ALL
        .into_iter()
        .filter(|c| c.grants(required))
        .collect();

    let granted_by = capabilities.iter().find(|c| c.grants(required));
    let (granted, reason) = match granted_by {
        Some(cap) => (true, format!("capability '{cap}' grants '{required}'")),
        None if capabilities.is_empty() => (
            false,
            format!("actor has no capabilities; '{required}' needs one of {granting_capabilities:?}"),
        ),
        None => (
            false,
            format!(
                "capabilities {capabilities:?} do not grant '{required}'; needs one of {granting_capabilities:?}"
            ),
        ),
    };

    AuthorizationExplanation {
        actor_id: principal.actor_id,
        required_permission: required,
        granted,
        reason,
        capabilities,
        granting_capabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seller_cannot_create_lots() {
        let principal = Principal::new(ActorId::new(), [Capability::Seller]);
        let err = authorize(&principal, Permission::CreateLot).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                actor_id: principal.actor_id,
                permission: Permission::CreateLot,
            }
        );
        assert!(authorize(&principal, Permission::RecordSale).is_ok());
    }

    #[test]
    fn explanation_names_granting_capabilities() {
        let principal = Principal::new(ActorId::new(), [Capability::Harvester]);
        let explanation = explain_authorization(&principal, Permission::RecordSale);
        assert!(!explanation.granted);
        assert_eq!(
            explanation.granting_capabilities,
            vec![Capability::Owner, Capability::Administrator, Capability::Seller]
        );
        assert!(explanation.reason.contains("lots.sale.record"));
    }

    #[test]
    fn explanation_for_granted_request() {
        let principal = Principal::new(ActorId::new(), [Capability::Owner]);
        let explanation = explain_authorization(&principal, Permission::DiscardLot);
        assert!(explanation.granted);
        assert!(explanation.reason.contains("owner"));
    }
}
