//! Importer registry: importer name to implementation.
//!
//! # Responsibility
//! - Keep a name-indexed table of importer factories.
//! - Provide the process-wide table, filled with the built-in importers on
//!   first use.
//!
//! # Invariants
//! - Names are non-empty `[a-z0-9_]` strings and unique within a registry.

use crate::config::Settings;
use crate::importer::base::{ImportOptions, Importer, ImporterBase};
use log::{debug, error};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

/// Builds a concrete importer on top of a configured base.
pub type ImporterFactory = fn(ImporterBase) -> Box<dyn Importer>;

/// One registered importer.
#[derive(Debug, Clone, Copy)]
pub struct ImporterEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: ImporterFactory,
}

impl ImporterEntry {
    /// Creates a ready-to-run importer for `settings` and `options`.
    pub fn instantiate(&self, settings: &Settings, options: ImportOptions) -> Box<dyn Importer> {
        (self.factory)(ImporterBase::new(self.name, settings, options))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    DuplicateName(String),
    NotFound(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "importer name is invalid: `{name}`"),
            Self::DuplicateName(name) => write!(f, "importer already registered: {name}"),
            Self::NotFound(name) => write!(f, "no importer named `{name}`"),
        }
    }
}

impl Error for RegistryError {}

#[derive(Debug, Clone, Default)]
pub struct ImporterRegistry {
    entries: BTreeMap<&'static str, ImporterEntry>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with every built-in importer.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for entry in super::BUILTIN_IMPORTERS {
            match registry.register(*entry) {
                Ok(()) => debug!(
                    "event=importer_register module=importer status=ok name={}",
                    entry.name
                ),
                Err(err) => error!(
                    "event=importer_register module=importer status=error name={} error={err}",
                    entry.name
                ),
            }
        }
        registry
    }

    pub fn register(&mut self, entry: ImporterEntry) -> Result<(), RegistryError> {
        if !is_valid_importer_name(entry.name) {
            return Err(RegistryError::InvalidName(entry.name.to_string()));
        }
        if self.entries.contains_key(entry.name) {
            return Err(RegistryError::DuplicateName(entry.name.to_string()));
        }
        self.entries.insert(entry.name, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ImporterEntry> {
        self.entries.get(name.trim()).copied()
    }

    /// Sorted importer names.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ImporterEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static IMPORTERS: Lazy<Mutex<ImporterRegistry>> =
    Lazy::new(|| Mutex::new(ImporterRegistry::with_builtin()));

fn global() -> MutexGuard<'static, ImporterRegistry> {
    // Registration cannot leave the map half-written, so a poisoned lock is
    // still consistent.
    IMPORTERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Adds an importer to the process-wide registry and returns it.
pub fn register_importer(entry: ImporterEntry) -> Result<ImporterEntry, RegistryError> {
    global().register(entry)?;
    Ok(entry)
}

/// Snapshot of the process-wide registry.
pub fn get_importers() -> ImporterRegistry {
    global().clone()
}

pub fn importer_by_name(name: &str) -> Result<ImporterEntry, RegistryError> {
    global()
        .get(name)
        .ok_or_else(|| RegistryError::NotFound(name.trim().to_string()))
}

fn is_valid_importer_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
