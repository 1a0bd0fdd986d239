//! Importer for GeoJSON feature collections of units.
//!
//! Feature properties form the unit payload. A `Point` geometry (`[lon, lat]`
//! in WGS84) becomes the unit location; the feature `id` is used as the unit
//! id when the properties carry none.

use crate::geo::convert_from_wgs84;
use crate::importer::base::{ImportSummary, Importer, ImporterBase};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::registry::ImporterEntry;
use crate::repo::unit_repo::UnitRepository;
use geojson::feature::Id;
use geojson::{Feature, GeoJson, Value as GeometryValue};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fs;

const DEFAULT_DATA_FILE: &str = "units.geojson";

pub const ENTRY: ImporterEntry = ImporterEntry {
    name: "units_geojson",
    description: "Units from a GeoJSON FeatureCollection with point geometries",
    factory: build,
};

fn build(base: ImporterBase) -> Box<dyn Importer> {
    Box::new(UnitsGeoJsonImporter::new(base))
}

pub struct UnitsGeoJsonImporter {
    base: ImporterBase,
}

impl UnitsGeoJsonImporter {
    pub fn new(base: ImporterBase) -> Self {
        Self { base }
    }

    fn read_features(&self) -> ImportResult<Vec<Feature>> {
        let path = self
            .base
            .find_data_file(self.base.data_file_name(DEFAULT_DATA_FILE))?;
        let text = fs::read_to_string(&path).map_err(|source| ImportError::Io {
            path: path.clone(),
            source,
        })?;
        let geojson = text.parse::<GeoJson>().map_err(|err| ImportError::Parse {
            path: path.clone(),
            message: err.to_string(),
        })?;
        match geojson {
            GeoJson::FeatureCollection(collection) => Ok(collection.features),
            _ => Err(ImportError::Parse {
                path,
                message: "expected a GeoJSON FeatureCollection".to_string(),
            }),
        }
    }

    /// Turns one feature into a unit payload.
    fn feature_payload(&self, index: usize, feature: Feature) -> ImportResult<Map<String, Value>> {
        let mut data = feature.properties.unwrap_or_default();

        if !data.contains_key("id") {
            match feature.id {
                Some(Id::String(id)) => {
                    data.insert("id".to_string(), Value::String(id));
                }
                Some(Id::Number(number)) => {
                    data.insert("id".to_string(), Value::String(number.to_string()));
                }
                None => {}
            }
        }

        let Some(geometry) = feature.geometry else {
            return Ok(data);
        };
        match geometry.value {
            GeometryValue::Point(position) => {
                let (Some(lon), Some(lat)) = (position.first(), position.get(1)) else {
                    return Err(ImportError::InvalidPayload(format!(
                        "features[{index}]: point needs longitude and latitude"
                    )));
                };
                let point = convert_from_wgs84((*lat, *lon), self.base.projection_srid())?;
                let location = serde_json::to_value(point).map_err(|err| {
                    ImportError::InvalidPayload(format!("features[{index}].geometry: {err}"))
                })?;
                data.insert("location".to_string(), location);
            }
            _ => {
                return Err(ImportError::InvalidPayload(format!(
                    "features[{index}]: only Point geometries can be imported as unit locations"
                )));
            }
        }
        Ok(data)
    }
}

impl Importer for UnitsGeoJsonImporter {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn import_units(&mut self, repo: &dyn UnitRepository) -> ImportResult<ImportSummary> {
        let features = self.read_features()?;
        if features.is_empty() {
            warn!(target: self.base.log_target(), "feature collection is empty");
        }

        let mut summary = ImportSummary::default();
        for (index, feature) in features.into_iter().enumerate() {
            let data = self.feature_payload(index, feature)?;
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
