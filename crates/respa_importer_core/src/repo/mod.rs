//! Repository layer: persistence contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define the persistence collaborator importers write through.
//! - Isolate SQLite query details from reconciliation logic.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod unit_repo;
