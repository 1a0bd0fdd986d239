mod common;

use common::{migrated_conn, settings_for};
use respa_importer_core::repo::unit_repo::{SqliteUnitRepository, UnitRepository};
use respa_importer_core::{ImportError, ImportOptions, ImportService, RegistryError};
use std::fs;
use std::path::Path;

const UNITS_JSON: &str = r#"[
  {
    "id": "tprek:8215",
    "name": {"fi": "Kallion kirjasto", "sv": "Berghälls bibliotek"},
    "location": {"lat": 60.18293, "lon": 24.95070},
    "identifiers": [{"namespace": "tprek", "value": "8215"}]
  },
  {
    "name": {"fi": "Oodi"},
    "identifiers": [{"namespace": "tprek", "value": "51342"}]
  }
]"#;

const UNITS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "tprek:8215",
      "geometry": {"type": "Point", "coordinates": [24.95070, 60.18293]},
      "properties": {"name": {"fi": "Kallion kirjasto"}, "phone": "09 3107 5078"}
    },
    {
      "type": "Feature",
      "id": 51342,
      "geometry": null,
      "properties": {"name": {"fi": "Oodi"}}
    }
  ]
}"#;

fn write_data(root: &Path, name: &str, contents: &str) {
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data").join(name), contents).unwrap();
}

fn unit_count(conn: &rusqlite::Connection) -> usize {
    SqliteUnitRepository::try_new(conn)
        .unwrap()
        .list_units()
        .unwrap()
        .len()
}

#[test]
fn units_json_run_creates_then_leaves_units_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "units.json", UNITS_JSON);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let first = ImportService::new(&mut conn, &settings)
        .run("units_json", ImportOptions::default())
        .unwrap();
    assert_eq!((first.created, first.updated, first.unchanged), (2, 0, 0));

    let second = ImportService::new(&mut conn, &settings)
        .run("units_json", ImportOptions::default())
        .unwrap();
    assert_eq!((second.created, second.updated, second.unchanged), (0, 0, 2));
    assert_eq!(unit_count(&conn), 2);

    let repo = SqliteUnitRepository::try_new(&conn).unwrap();
    let kallio = repo.get_unit("tprek:8215").unwrap().unwrap();
    let location = kallio.location.unwrap();
    assert_eq!(location.srid, 3067);
    assert!((380_000.0..395_000.0).contains(&location.x));
    assert!((6_670_000.0..6_680_000.0).contains(&location.y));

    let oodi = repo.find_unit_by_identifier("tprek", "51342").unwrap().unwrap();
    assert_eq!(oodi.name.fi.as_deref(), Some("Oodi"));
}

#[test]
fn changed_source_updates_only_that_unit() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "units.json", UNITS_JSON);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();
    ImportService::new(&mut conn, &settings)
        .run("units_json", ImportOptions::default())
        .unwrap();

    write_data(
        dir.path(),
        "units.json",
        &UNITS_JSON.replace("Berghälls bibliotek", "Berghälls stadsbibliotek"),
    );
    let summary = ImportService::new(&mut conn, &settings)
        .run("units_json", ImportOptions::default())
        .unwrap();
    assert_eq!((summary.created, summary.updated, summary.unchanged), (0, 1, 1));

    let repo = SqliteUnitRepository::try_new(&conn).unwrap();
    let kallio = repo.get_unit("tprek:8215").unwrap().unwrap();
    assert_eq!(kallio.name.sv.as_deref(), Some("Berghälls stadsbibliotek"));
}

#[test]
fn dry_run_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "units.json", UNITS_JSON);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let summary = ImportService::new(&mut conn, &settings)
        .run(
            "units_json",
            ImportOptions {
                data_file: None,
                dry_run: true,
            },
        )
        .unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(unit_count(&conn), 0);
}

#[test]
fn failing_unit_rolls_back_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let broken = r#"[
      {"id": "u1", "name": {"fi": "Ok"}},
      {"id": "u2", "address_zip": "this zip code is far too long"}
    ]"#;
    write_data(dir.path(), "units.json", broken);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let err = ImportService::new(&mut conn, &settings)
        .run("units_json", ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::FieldTooLong { .. }));
    assert_eq!(unit_count(&conn), 0);
}

#[test]
fn data_file_option_selects_other_file() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "libraries.json", UNITS_JSON);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let summary = ImportService::new(&mut conn, &settings)
        .run(
            "units_json",
            ImportOptions {
                data_file: Some("libraries.json".to_string()),
                dry_run: false,
            },
        )
        .unwrap();
    assert_eq!(summary.total(), 2);
}

#[test]
fn missing_data_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let err = ImportService::new(&mut conn, &settings)
        .run(
            "units_json",
            ImportOptions {
                data_file: Some("nowhere.json".to_string()),
                dry_run: false,
            },
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Data file 'nowhere.json' not found");
}

#[test]
fn units_geojson_uses_feature_ids_and_point_geometry() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "units.geojson", UNITS_GEOJSON);
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let summary = ImportService::new(&mut conn, &settings)
        .run("units_geojson", ImportOptions::default())
        .unwrap();
    assert_eq!(summary.created, 2);

    let repo = SqliteUnitRepository::try_new(&conn).unwrap();
    let kallio = repo.get_unit("tprek:8215").unwrap().unwrap();
    assert_eq!(kallio.phone.as_deref(), Some("09 3107 5078"));
    assert_eq!(kallio.location.map(|point| point.srid), Some(3067));

    let oodi = repo.get_unit("51342").unwrap().unwrap();
    assert_eq!(oodi.location, None);
}

#[test]
fn unknown_importer_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let err = ImportService::new(&mut conn, &settings)
        .run("kirjastot", ImportOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::Registry(RegistryError::NotFound(ref name)) if name == "kirjastot"
    ));
}

#[test]
fn builtin_importers_are_listed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path());
    let mut conn = migrated_conn();

    let names: Vec<&str> = ImportService::new(&mut conn, &settings)
        .list_importers()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert!(names.contains(&"units_json"));
    assert!(names.contains(&"units_geojson"));
}
