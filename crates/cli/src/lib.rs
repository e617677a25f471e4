//! `lotbook`: run scripted lot operations through an in-memory registry.

pub mod script;

pub use script::{Report, Script, ScriptError, Step, StepOutcome};
