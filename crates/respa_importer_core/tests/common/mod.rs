#![allow(dead_code)]

use respa_importer_core::db::open_db_in_memory;
use respa_importer_core::model::unit::{Unit, UnitIdentifier};
use respa_importer_core::repo::unit_repo::{RepoResult, UnitRepository};
use respa_importer_core::{ImportOptions, ImporterBase, Settings};
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::path::Path;

pub fn migrated_conn() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn settings_for(root: &Path) -> Settings {
    Settings {
        project_root: Some(root.to_path_buf()),
        ..Settings::default()
    }
}

pub fn importer_base(name: &'static str) -> ImporterBase {
    ImporterBase::new(name, &Settings::default(), ImportOptions::default())
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Repository wrapper that counts write calls.
pub struct CountingRepository<R> {
    inner: R,
    pub unit_creates: Cell<usize>,
    pub unit_updates: Cell<usize>,
    pub identifier_creates: Cell<usize>,
    pub identifier_updates: Cell<usize>,
}

impl<R: UnitRepository> CountingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            unit_creates: Cell::new(0),
            unit_updates: Cell::new(0),
            identifier_creates: Cell::new(0),
            identifier_updates: Cell::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.unit_creates.get()
            + self.unit_updates.get()
            + self.identifier_creates.get()
            + self.identifier_updates.get()
    }

    pub fn reset(&self) {
        self.unit_creates.set(0);
        self.unit_updates.set(0);
        self.identifier_creates.set(0);
        self.identifier_updates.set(0);
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl<R: UnitRepository> UnitRepository for CountingRepository<R> {
    fn get_unit(&self, id: &str) -> RepoResult<Option<Unit>> {
        self.inner.get_unit(id)
    }

    fn list_units(&self) -> RepoResult<Vec<Unit>> {
        self.inner.list_units()
    }

    fn create_unit(&self, unit: &Unit) -> RepoResult<()> {
        bump(&self.unit_creates);
        self.inner.create_unit(unit)
    }

    fn update_unit(&self, unit: &Unit) -> RepoResult<()> {
        bump(&self.unit_updates);
        self.inner.update_unit(unit)
    }

    fn find_unit_by_identifier(&self, namespace: &str, value: &str) -> RepoResult<Option<Unit>> {
        self.inner.find_unit_by_identifier(namespace, value)
    }

    fn list_identifiers(&self, unit_id: &str) -> RepoResult<Vec<UnitIdentifier>> {
        self.inner.list_identifiers(unit_id)
    }

    fn create_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()> {
        bump(&self.identifier_creates);
        self.inner.create_identifier(identifier)
    }

    fn update_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()> {
        bump(&self.identifier_updates);
        self.inner.update_identifier(identifier)
    }
}
