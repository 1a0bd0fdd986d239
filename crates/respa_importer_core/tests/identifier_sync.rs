mod common;

use common::{importer_base, migrated_conn, object, CountingRepository};
use respa_importer_core::model::unit::{Unit, UnitIdentifier};
use respa_importer_core::repo::unit_repo::{SqliteUnitRepository, UnitRepository};
use respa_importer_core::ImportError;
use serde_json::json;

fn identifier_values(repo: &dyn UnitRepository, unit_id: &str) -> Vec<(String, String)> {
    repo.list_identifiers(unit_id)
        .unwrap()
        .into_iter()
        .map(|identifier| (identifier.namespace, identifier.value))
        .collect()
}

#[test]
fn identifiers_of_new_unit_are_created() {
    let conn = migrated_conn();
    let repo = CountingRepository::new(SqliteUnitRepository::try_new(&conn).unwrap());

    importer_base("units_json")
        .save_unit(
            &repo,
            &json!({
                "id": "u1",
                "identifiers": [
                    {"namespace": "tprek", "value": "8215"},
                    {"namespace": "kirjastot.fi", "value": "kallio"}
                ]
            }),
            None,
        )
        .unwrap();

    assert_eq!(repo.identifier_creates.get(), 2);
    assert_eq!(
        identifier_values(&repo, "u1"),
        vec![
            ("kirjastot.fi".to_string(), "kallio".to_string()),
            ("tprek".to_string(), "8215".to_string()),
        ]
    );
}

#[test]
fn changed_identifier_is_updated_and_omitted_one_kept() {
    let conn = migrated_conn();
    let sqlite = SqliteUnitRepository::try_new(&conn).unwrap();
    sqlite.create_unit(&Unit::with_id("u1")).unwrap();
    sqlite
        .create_identifier(&UnitIdentifier::new("u1", "tprek", "8215"))
        .unwrap();
    sqlite
        .create_identifier(&UnitIdentifier::new("u1", "kirjastot.fi", "kallio"))
        .unwrap();

    let repo = CountingRepository::new(sqlite);
    let existing = repo.get_unit("u1").unwrap();
    let outcome = importer_base("units_json")
        .save_unit(
            &repo,
            &json!({"identifiers": [{"namespace": "tprek", "value": "9000"}]}),
            existing,
        )
        .unwrap();

    assert!(outcome.changed);
    assert!(outcome.changed_fields.is_empty());
    assert_eq!(repo.identifier_updates.get(), 1);
    assert_eq!(repo.identifier_creates.get(), 0);
    assert_eq!(
        identifier_values(&repo, "u1"),
        vec![
            ("kirjastot.fi".to_string(), "kallio".to_string()),
            ("tprek".to_string(), "9000".to_string()),
        ]
    );
}

#[test]
fn matching_identifiers_write_nothing() {
    let conn = migrated_conn();
    let sqlite = SqliteUnitRepository::try_new(&conn).unwrap();
    sqlite.create_unit(&Unit::with_id("u1")).unwrap();
    sqlite
        .create_identifier(&UnitIdentifier::new("u1", "tprek", "8215"))
        .unwrap();

    let repo = CountingRepository::new(sqlite);
    let existing = repo.get_unit("u1").unwrap();
    let outcome = importer_base("units_json")
        .save_unit(
            &repo,
            &json!({"identifiers": [{"namespace": "tprek", "value": "8215"}]}),
            existing,
        )
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(repo.writes(), 0);
}

#[test]
fn existing_unit_is_found_by_identifier() {
    let conn = migrated_conn();
    let sqlite = SqliteUnitRepository::try_new(&conn).unwrap();
    sqlite.create_unit(&Unit::with_id("u1")).unwrap();
    sqlite
        .create_identifier(&UnitIdentifier::new("u1", "tprek", "51342"))
        .unwrap();

    let payload = object(json!({
        "identifiers": [
            {"namespace": "kirjastot.fi", "value": "oodi"},
            {"namespace": "tprek", "value": "51342"}
        ]
    }));
    let found = importer_base("units_json")
        .find_existing_unit(&sqlite, &payload)
        .unwrap();
    assert_eq!(found.map(|unit| unit.id), Some("u1".to_string()));
}

#[test]
fn too_long_identifier_value_is_rejected() {
    let conn = migrated_conn();
    let sqlite = SqliteUnitRepository::try_new(&conn).unwrap();
    sqlite.create_unit(&Unit::with_id("u1")).unwrap();

    let existing = sqlite.get_unit("u1").unwrap();
    let err = importer_base("units_json")
        .save_unit(
            &sqlite,
            &json!({"identifiers": [{"namespace": "tprek", "value": "9".repeat(101)}]}),
            existing,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::FieldTooLong { ref field, max_length: 100, .. } if field == "value"
    ));
}

#[test]
fn empty_identifier_namespace_is_invalid_payload() {
    let conn = migrated_conn();
    let repo = CountingRepository::new(SqliteUnitRepository::try_new(&conn).unwrap());

    let err = importer_base("units_json")
        .save_unit(
            &repo,
            &json!({"id": "u1", "identifiers": [{"namespace": "", "value": "8215"}]}),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidPayload(ref message) if message.contains("namespace")));
    assert_eq!(repo.writes(), 0);
}
