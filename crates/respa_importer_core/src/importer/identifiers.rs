//! Secondary identifier reconciliation for units.
//!
//! # Invariants
//! - Identifiers are keyed by namespace; at most one per unit and namespace.
//! - Identifiers missing from the payload are kept as they are.

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reconcile::Tracked;
use crate::model::unit::{Unit, UnitIdentifier};
use crate::repo::unit_repo::UnitRepository;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const NAMESPACE_MAX_LENGTH: usize = 50;
const VALUE_MAX_LENGTH: usize = 100;

/// One `{ "namespace", "value" }` entry of a payload's `identifiers` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentifierPayload {
    pub namespace: String,
    pub value: String,
}

/// Reads the `identifiers` entry of a payload. Absent or `null` means none.
pub fn parse_identifiers(raw: Option<&Value>) -> ImportResult<Vec<IdentifierPayload>> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| -> ImportResult<IdentifierPayload> {
                let identifier = IdentifierPayload::deserialize(entry).map_err(|err| {
                    ImportError::InvalidPayload(format!("identifiers[{index}]: {err}"))
                })?;
                if identifier.namespace.trim().is_empty() {
                    return Err(ImportError::InvalidPayload(format!(
                        "identifiers[{index}]: namespace must not be empty"
                    )));
                }
                Ok(identifier)
            })
            .collect(),
        Some(other) => Err(ImportError::InvalidPayload(format!(
            "identifiers must be a list, got `{other}`"
        ))),
    }
}

/// Synchronizes the unit's identifiers with `identifiers`.
///
/// Existing namespaces with a different value are updated, unknown
/// namespaces are created; either marks the unit changed. The unit must
/// already be persisted.
pub fn sync_identifiers(
    repo: &dyn UnitRepository,
    tracked: &mut Tracked<Unit>,
    identifiers: &[IdentifierPayload],
) -> ImportResult<()> {
    let unit_id = tracked.record().id.clone();
    let mut existing: BTreeMap<String, UnitIdentifier> = repo
        .list_identifiers(&unit_id)?
        .into_iter()
        .map(|identifier| (identifier.namespace.clone(), identifier))
        .collect();

    for entry in identifiers {
        check_length("namespace", &entry.namespace, NAMESPACE_MAX_LENGTH)?;
        check_length("value", &entry.value, VALUE_MAX_LENGTH)?;

        match existing.get_mut(&entry.namespace) {
            Some(identifier) => {
                if identifier.value != entry.value {
                    identifier.value = entry.value.clone();
                    repo.update_identifier(identifier)?;
                    tracked.mark_changed();
                }
            }
            None => {
                let identifier =
                    UnitIdentifier::new(unit_id.as_str(), entry.namespace.as_str(), entry.value.as_str());
                repo.create_identifier(&identifier)?;
                existing.insert(identifier.namespace.clone(), identifier);
                tracked.mark_changed();
            }
        }
    }

    Ok(())
}

fn check_length(field: &str, value: &str, max_length: usize) -> ImportResult<()> {
    if value.chars().count() > max_length {
        return Err(ImportError::FieldTooLong {
            field: field.to_string(),
            max_length,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_identifiers;
    use crate::importer::error::ImportError;
    use serde_json::json;

    #[test]
    fn absent_or_null_identifiers_parse_as_empty() {
        assert!(parse_identifiers(None).unwrap().is_empty());
        assert!(parse_identifiers(Some(&json!(null))).unwrap().is_empty());
    }

    #[test]
    fn entries_require_namespace_and_value() {
        let raw = json!([{"namespace": "tprek", "value": "8215"}, {"namespace": "kirjastot"}]);
        let err = parse_identifiers(Some(&raw)).unwrap_err();
        match err {
            ImportError::InvalidPayload(message) => assert!(message.starts_with("identifiers[1]")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_list_identifiers_are_rejected() {
        let err = parse_identifiers(Some(&json!({"tprek": "8215"}))).unwrap_err();
        assert!(matches!(err, ImportError::InvalidPayload(_)));
    }
}
