//! Field-level reconciliation of a record against an import payload.
//!
//! # Responsibility
//! - Write only the fields whose payload value differs from the record.
//! - Track which fields changed and whether the record is new.
//!
//! # Invariants
//! - Fields absent from the payload are never touched.
//! - A translated field present in the payload writes every language; a
//!   missing language becomes null.
//! - Length limits are enforced for `FieldKind::Char` only.

use crate::importer::error::{ImportError, ImportResult};
use crate::model::field::{FieldKind, FieldValue, FieldValueError, Model};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A record together with its reconciliation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<M> {
    record: M,
    created: bool,
    changed: bool,
    changed_fields: Vec<String>,
}

impl<M: Model> Tracked<M> {
    /// Wraps a record that does not exist in storage yet.
    pub fn created(record: M) -> Self {
        Self {
            record,
            created: true,
            changed: false,
            changed_fields: Vec::new(),
        }
    }

    /// Wraps a record loaded from storage.
    pub fn existing(record: M) -> Self {
        Self {
            record,
            created: false,
            changed: false,
            changed_fields: Vec::new(),
        }
    }

    pub fn record(&self) -> &M {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut M {
        &mut self.record
    }

    pub fn into_record(self) -> M {
        self.record
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn changed_fields(&self) -> &[String] {
        &self.changed_fields
    }

    /// Flags a change that is not tied to one of the record's own fields,
    /// e.g. an identifier row written for it.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Sets one concrete field when `value` differs from the current value.
    ///
    /// # Errors
    /// - `FieldTooLong` when a text value exceeds a `Char` field's limit.
    /// - `Field` when the field is unknown, not nullable, or of another type.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> ImportResult<()> {
        let field_error = |source: FieldValueError| ImportError::Field {
            field: name.to_string(),
            source,
        };
        let meta = M::meta()
            .field(name)
            .ok_or_else(|| field_error(FieldValueError::UnknownField(name.to_string())))?;
        let current = self
            .record
            .field_value(name)
            .ok_or_else(|| field_error(FieldValueError::UnknownField(name.to_string())))?;

        if current == value {
            return Ok(());
        }

        if let (FieldKind::Char { max_length }, FieldValue::Text(text)) = (meta.kind, &value) {
            if text.chars().count() > max_length {
                return Err(ImportError::FieldTooLong {
                    field: name.to_string(),
                    max_length,
                    value: text.clone(),
                });
            }
        }
        if value.is_null() && !meta.nullable {
            return Err(field_error(FieldValueError::NotNullable(name.to_string())));
        }

        self.record.set_field_value(name, value).map_err(field_error)?;
        self.changed = true;
        self.changed_fields.push(name.to_string());
        Ok(())
    }
}

/// Applies every payload field to `tracked`, except `skip_fields`.
///
/// Translated fields are expanded into their concrete per-language fields
/// first; their base and concrete names are then excluded from the plain
/// pass. Payload keys that name no field are ignored.
pub fn update_fields<M: Model>(
    tracked: &mut Tracked<M>,
    payload: &Map<String, Value>,
    skip_fields: &[&str],
) -> ImportResult<()> {
    let meta = M::meta();
    let mut skipped: BTreeSet<&str> = skip_fields.iter().copied().collect();

    for translated in meta.translations {
        skipped.insert(translated.name);
        skipped.extend(translated.languages.iter().map(|(_, concrete)| *concrete));

        let Some(data) = payload.get(translated.name) else {
            continue;
        };
        let by_language = match data {
            Value::Null => None,
            Value::Object(map) => Some(map),
            other => {
                return Err(ImportError::InvalidPayload(format!(
                    "translated field `{}` must be an object keyed by language, got `{other}`",
                    translated.name
                )));
            }
        };

        for (lang, concrete) in translated.languages {
            let raw = by_language
                .and_then(|map| map.get(*lang))
                .unwrap_or(&Value::Null);
            let value = typed_value::<M>(concrete, raw)?;
            tracked.set_field(concrete, value)?;
        }
    }

    for field in meta.fields {
        if skipped.contains(field.name) {
            continue;
        }
        let Some(raw) = payload.get(field.name) else {
            continue;
        };
        let value = typed_value::<M>(field.name, raw)?;
        tracked.set_field(field.name, value)?;
    }

    Ok(())
}

fn typed_value<M: Model>(name: &str, raw: &Value) -> ImportResult<FieldValue> {
    let meta = M::meta()
        .field(name)
        .ok_or_else(|| ImportError::Field {
            field: name.to_string(),
            source: FieldValueError::UnknownField(name.to_string()),
        })?;
    FieldValue::from_payload(meta.kind, raw).map_err(|source| ImportError::Field {
        field: name.to_string(),
        source,
    })
}
