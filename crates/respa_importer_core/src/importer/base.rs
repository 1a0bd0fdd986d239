//! Shared importer plumbing: data file lookup and unit saving.
//!
//! # Responsibility
//! - Resolve data file search paths from configuration.
//! - Save one unit payload through field and identifier reconciliation.
//! - Bring payload locations into the application projection.
//!
//! # Invariants
//! - Stored locations are always in `projection_srid`.
//! - An existing unit is written only when something about it changed.
//! - A new unit is inserted exactly once, before its identifiers.
//! - A persisted unit's id never changes.

use crate::config::Settings;
use crate::geo::{convert_from_wgs84, transform, Point};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::id_gen::generate_id;
use crate::importer::identifiers::{parse_identifiers, sync_identifiers};
use crate::importer::reconcile::{update_fields, Tracked};
use crate::model::field::FieldValueError;
use crate::model::unit::Unit;
use crate::repo::unit_repo::UnitRepository;
use log::{debug, info};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Data directory shipped with this crate, searched after the project one.
const APP_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

const UNIT_ID_MAX_LENGTH: usize = 50;

/// Payload keys handled by `save_unit` itself rather than field reconciliation.
const UNIT_RESERVED_KEYS: &[&str] = &["id", "identifiers"];

/// Options passed from the command line to an importer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Overrides the importer's default data file name.
    pub data_file: Option<String>,
    /// Run everything but roll the transaction back at the end.
    pub dry_run: bool,
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: &SaveOutcome) {
        if outcome.created {
            self.created += 1;
        } else if outcome.changed {
            self.updated += 1;
        } else {
            self.unchanged += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Result of saving one unit payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub unit: Unit,
    pub created: bool,
    /// Any field or identifier was written.
    pub changed: bool,
    pub changed_fields: Vec<String>,
}

/// A source-specific importer.
pub trait Importer {
    fn name(&self) -> &str;

    /// Reads the importer's dataset and saves every unit in it.
    fn import_units(&mut self, repo: &dyn UnitRepository) -> ImportResult<ImportSummary>;
}

/// Configuration and helpers every concrete importer builds on.
#[derive(Debug, Clone)]
pub struct ImporterBase {
    name: &'static str,
    log_target: String,
    data_paths: Vec<PathBuf>,
    projection_srid: u32,
    options: ImportOptions,
}

impl ImporterBase {
    pub fn new(name: &'static str, settings: &Settings, options: ImportOptions) -> Self {
        let data_paths = vec![settings.root_dir().join("data"), PathBuf::from(APP_DATA_DIR)];
        Self {
            name,
            log_target: format!("{name}_importer"),
            data_paths,
            projection_srid: settings.projection_srid,
            options,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Log target of this importer, `<name>_importer`.
    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    pub fn data_paths(&self) -> &[PathBuf] {
        &self.data_paths
    }

    pub fn projection_srid(&self) -> u32 {
        self.projection_srid
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Data file to read: the `data_file` option, else `default_name`.
    pub fn data_file_name<'a>(&'a self, default_name: &'a str) -> &'a str {
        self.options.data_file.as_deref().unwrap_or(default_name)
    }

    /// Returns the first data path that contains `data_file`.
    ///
    /// An absolute `data_file` is used as-is when it exists.
    pub fn find_data_file(&self, data_file: &str) -> ImportResult<PathBuf> {
        let candidate = Path::new(data_file);
        if candidate.is_absolute() {
            return if candidate.exists() {
                Ok(candidate.to_path_buf())
            } else {
                Err(ImportError::DataFileNotFound(data_file.to_string()))
            };
        }

        self.data_paths
            .iter()
            .map(|dir| dir.join(data_file))
            .find(|path| path.exists())
            .ok_or_else(|| ImportError::DataFileNotFound(data_file.to_string()))
    }

    /// Looks up the stored unit a payload refers to.
    ///
    /// A payload `id` is authoritative; without one, the first listed
    /// identifier that matches a stored unit wins.
    pub fn find_existing_unit(
        &self,
        repo: &dyn UnitRepository,
        payload: &Map<String, Value>,
    ) -> ImportResult<Option<Unit>> {
        if let Some(id) = payload_id(payload)? {
            return Ok(repo.get_unit(id)?);
        }
        for identifier in parse_identifiers(payload.get("identifiers"))? {
            if let Some(unit) = repo.find_unit_by_identifier(&identifier.namespace, &identifier.value)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// Saves one unit payload.
    ///
    /// Without `existing`, a unit stored under the payload `id` is updated;
    /// otherwise a new unit is created.
    ///
    /// # Errors
    /// - `InvalidPayload` when `payload` is not an object or is malformed.
    /// - `FieldTooLong` / `Field` from field reconciliation.
    /// - `Geo` when the location cannot be brought into `projection_srid`.
    /// - `IdentityMismatch` when the payload id differs from `existing.id`.
    /// - Repository errors are propagated unchanged.
    pub fn save_unit(
        &self,
        repo: &dyn UnitRepository,
        payload: &Value,
        existing: Option<Unit>,
    ) -> ImportResult<SaveOutcome> {
        let Value::Object(data) = payload else {
            return Err(ImportError::InvalidPayload(format!(
                "unit payload must be an object, got `{payload}`"
            )));
        };
        let mut data = data.clone();
        project_location(&mut data, self.projection_srid)?;
        let identifiers = parse_identifiers(data.get("identifiers"))?;
        let id = payload_id(&data)?;

        let existing = match (existing, id) {
            (Some(unit), _) => Some(unit),
            (None, Some(id)) => repo.get_unit(id)?,
            (None, None) => None,
        };
        let mut tracked = match existing {
            Some(unit) => Tracked::existing(unit),
            None => Tracked::created(Unit::default()),
        };
        update_fields(&mut tracked, &data, UNIT_RESERVED_KEYS)?;
        self.assign_id(&mut tracked, id)?;

        if tracked.is_created() {
            repo.create_unit(tracked.record())?;
            info!(target: self.log_target(), "{} created", tracked.record());
        }

        sync_identifiers(repo, &mut tracked, &identifiers)?;

        if tracked.is_changed() && !tracked.is_created() {
            info!(
                target: self.log_target(),
                "{} changed: {}",
                tracked.record(),
                tracked.changed_fields().join(", ")
            );
            repo.update_unit(tracked.record())?;
        } else if !tracked.is_created() {
            debug!(target: self.log_target(), "{} unchanged", tracked.record());
        }

        let created = tracked.is_created();
        let changed = tracked.is_changed();
        let changed_fields = tracked.changed_fields().to_vec();
        Ok(SaveOutcome {
            unit: tracked.into_record(),
            created,
            changed,
            changed_fields,
        })
    }

    fn assign_id(&self, tracked: &mut Tracked<Unit>, payload_id: Option<&str>) -> ImportResult<()> {
        if !tracked.is_created() {
            let existing = tracked.record().id.as_str();
            return match payload_id {
                Some(id) if id != existing => Err(ImportError::IdentityMismatch {
                    existing: existing.to_string(),
                    payload: id.to_string(),
                }),
                _ => Ok(()),
            };
        }

        let id = match payload_id {
            Some(id) => id.to_string(),
            None => generate_id(),
        };
        if id.chars().count() > UNIT_ID_MAX_LENGTH {
            return Err(ImportError::FieldTooLong {
                field: "id".to_string(),
                max_length: UNIT_ID_MAX_LENGTH,
                value: id,
            });
        }
        tracked.record_mut().id = id;
        Ok(())
    }
}

/// Replaces the payload `location` with a point in `target_srid`.
///
/// Accepts WGS84 `{ "lat", "lon" }` or `{ "srid", "x", "y" }` in any
/// supported spatial reference. `null` and absence are left alone.
pub fn project_location(data: &mut Map<String, Value>, target_srid: u32) -> ImportResult<()> {
    let location = match data.get("location") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(location)) => location,
        Some(other) => {
            return Err(ImportError::InvalidPayload(format!(
                "location must be an object, got `{other}`"
            )));
        }
    };

    let point = if location.contains_key("srid") {
        let point = serde_json::from_value::<Point>(Value::Object(location.clone())).map_err(
            |err| ImportError::Field {
                field: "location".to_string(),
                source: FieldValueError::InvalidPoint(err.to_string()),
            },
        )?;
        transform(point, target_srid)?
    } else {
        let coordinate = |key: &str| {
            location.get(key).and_then(Value::as_f64).ok_or_else(|| {
                ImportError::InvalidPayload(format!("location.{key} must be a number"))
            })
        };
        convert_from_wgs84((coordinate("lat")?, coordinate("lon")?), target_srid)?
    };

    let projected = serde_json::to_value(point)
        .map_err(|err| ImportError::InvalidPayload(format!("location: {err}")))?;
    data.insert("location".to_string(), projected);
    Ok(())
}

/// Payload `id` as a non-empty string; `null`, `""` and absence mean none.
fn payload_id(data: &Map<String, Value>) -> ImportResult<Option<&str>> {
    match data.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.as_str())),
        Some(other) => Err(ImportError::InvalidPayload(format!(
            "unit id must be a string, got `{other}`"
        ))),
    }
}
