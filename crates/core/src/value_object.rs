//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one. `Pounds` and `Money` are the main value objects of the
/// lot ledger; a sale of 500 lb is the same quantity wherever it appears.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
