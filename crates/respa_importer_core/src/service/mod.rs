//! Use-case services.
//!
//! # Responsibility
//! - Run importers inside a storage transaction.
//! - Keep CLI callers decoupled from repository wiring.

pub mod import_service;
