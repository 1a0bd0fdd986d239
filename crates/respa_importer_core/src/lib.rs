//! Core of the Respa unit importer.
//!
//! Reads unit datasets, reconciles them field by field against the unit
//! store and writes only what changed.

pub mod config;
pub mod db;
pub mod geo;
pub mod importer;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, Settings};
pub use geo::{convert_from_wgs84, Point, PROJECTION_SRID};
pub use importer::base::{ImportOptions, ImportSummary, Importer, ImporterBase, SaveOutcome};
pub use importer::error::{ImportError, ImportResult};
pub use importer::id_gen::generate_id;
pub use importer::registry::{get_importers, register_importer, ImporterEntry, RegistryError};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::unit::{Unit, UnitIdentifier};
pub use repo::unit_repo::{RepoError, RepoResult, SqliteUnitRepository, UnitRepository};
pub use service::import_service::ImportService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
