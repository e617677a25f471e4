//! `aquaerp-auth`: capability-based authorization for the lot ledger.
//!
//! Authentication happens elsewhere: by the time a command reaches the ledger
//! the caller is identified by an `ActorId`. This crate answers one question:
//! may this actor perform this operation? It is decoupled from HTTP and storage.

pub mod authorize;
pub mod capability;
pub mod directory;
pub mod permissions;
pub mod principal;

pub use authorize::{
    AuthorizationExplanation, AuthzError, CommandAuthorization, authorize, explain_authorization,
};
pub use capability::Capability;
pub use directory::{CapabilityDirectory, CapabilityLookup};
pub use permissions::Permission;
pub use principal::Principal;
