//! Domain events and commands.
//!
//! The lot ledger is event-sourced: every accepted command becomes one or more
//! immutable events, and a lot's state is the fold of its event stream.

pub mod command;
pub mod event;

pub use command::Command;
pub use event::Event;
