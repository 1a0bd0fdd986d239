//! Domain model for imported records.
//!
//! # Responsibility
//! - Define the unit records synchronized from external datasets.
//! - Describe record fields so payload reconciliation can stay generic.
//!
//! # Invariants
//! - Field metadata (`ModelMeta`) and field accessors (`Model`) agree on the
//!   set of concrete field names.

pub mod field;
pub mod unit;
