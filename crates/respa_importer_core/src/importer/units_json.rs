//! Importer for JSON arrays of unit payloads.
//!
//! Each array element is a unit payload. `location` may be given in WGS84 as
//! `{ "lat", "lon" }` or as `{ "srid", "x", "y" }`; `save_unit` brings it
//! into the application projection.

use crate::importer::base::{ImportSummary, Importer, ImporterBase};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::registry::ImporterEntry;
use crate::repo::unit_repo::UnitRepository;
use log::info;
use serde_json::Value;
use std::fs;

const DEFAULT_DATA_FILE: &str = "units.json";

pub const ENTRY: ImporterEntry = ImporterEntry {
    name: "units_json",
    description: "Units from a JSON array of unit payloads",
    factory: build,
};

fn build(base: ImporterBase) -> Box<dyn Importer> {
    Box::new(UnitsJsonImporter::new(base))
}

pub struct UnitsJsonImporter {
    base: ImporterBase,
}

impl UnitsJsonImporter {
    pub fn new(base: ImporterBase) -> Self {
        Self { base }
    }

    fn read_payloads(&self) -> ImportResult<Vec<Value>> {
        let path = self
            .base
            .find_data_file(self.base.data_file_name(DEFAULT_DATA_FILE))?;
        let text = fs::read_to_string(&path).map_err(|source| ImportError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str::<Vec<Value>>(&text).map_err(|err| ImportError::Parse {
            path,
            message: err.to_string(),
        })
    }
}

impl Importer for UnitsJsonImporter {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn import_units(&mut self, repo: &dyn UnitRepository) -> ImportResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for (index, payload) in self.read_payloads()?.into_iter().enumerate() {
            let Value::Object(data) = payload else {
                return Err(ImportError::InvalidPayload(format!(
                    "units[{index}] must be an object"
                )));
            };
            let existing = self.base.find_existing_unit(repo, &data)?;
            let outcome = self.base.save_unit(repo, &Value::Object(data), existing)?;
            summary.record(&outcome);
        }

        info!(
            target: self.base.log_target(),
            "event=import_units status=ok created={} updated={} unchanged={}",
            summary.created,
            summary.updated,
            summary.unchanged
        );
        Ok(summary)
    }
}
