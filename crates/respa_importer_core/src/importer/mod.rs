//! Unit importers and the reconciliation helpers they share.
//!
//! # Responsibility
//! - Synchronize external unit datasets into the unit store.
//! - Write only what changed: fields, identifiers, whole records.
//! - Keep a registry of importers selectable by name.
//!
//! # Invariants
//! - Importers never delete units or identifiers.
//! - Every importer is reachable through the registry.

pub mod base;
pub mod error;
pub mod id_gen;
pub mod identifiers;
pub mod reconcile;
pub mod registry;
pub mod units_geojson;
pub mod units_json;

use registry::ImporterEntry;

/// Importers available in every process; the registry loads them on first use.
pub(crate) const BUILTIN_IMPORTERS: &[ImporterEntry] = &[units_json::ENTRY, units_geojson::ENTRY];
