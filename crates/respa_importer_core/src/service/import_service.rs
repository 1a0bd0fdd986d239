//! Importer run use-case.
//!
//! # Responsibility
//! - Resolve an importer by name and run it against the unit store.
//! - Own the transaction boundary of a run.
//!
//! # Invariants
//! - A run either commits every unit it saved or none of them.
//! - Dry runs always roll back.

use crate::config::Settings;
use crate::importer::base::{ImportOptions, ImportSummary};
use crate::importer::error::ImportResult;
use crate::importer::registry::{get_importers, importer_by_name, ImporterEntry};
use crate::repo::unit_repo::SqliteUnitRepository;
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Runs registered importers against one database connection.
pub struct ImportService<'a> {
    conn: &'a mut Connection,
    settings: &'a Settings,
}

impl<'a> ImportService<'a> {
    pub fn new(conn: &'a mut Connection, settings: &'a Settings) -> Self {
        Self { conn, settings }
    }

    /// Registered importers, ordered by name.
    pub fn list_importers(&self) -> Vec<ImporterEntry> {
        get_importers().entries().copied().collect()
    }

    /// Runs importer `name` in one transaction.
    ///
    /// # Errors
    /// - `Registry` when no importer is registered under `name`.
    /// - Any importer error; the transaction is rolled back.
    pub fn run(&mut self, name: &str, options: ImportOptions) -> ImportResult<ImportSummary> {
        let entry = importer_by_name(name)?;
        let dry_run = options.dry_run;
        let started = Instant::now();
        info!(
            "event=import_run module=service status=start importer={} dry_run={}",
            entry.name, dry_run
        );

        let mut importer = entry.instantiate(self.settings, options);
        let tx = self.conn.transaction()?;
        let result = {
            let repo = SqliteUnitRepository::try_new(&tx)?;
            importer.import_units(&repo)
        };

        let summary = match result {
            Ok(summary) => summary,
            Err(err) => {
                error!(
                    "event=import_run module=service status=error importer={} error={}",
                    entry.name, err
                );
                tx.rollback()?;
                return Err(err);
            }
        };

        if dry_run {
            tx.rollback()?;
        } else {
            tx.commit()?;
        }
        info!(
            "event=import_run module=service status=ok importer={} dry_run={} created={} updated={} unchanged={} elapsed_ms={}",
            entry.name,
            dry_run,
            summary.created,
            summary.updated,
            summary.unchanged,
            started.elapsed().as_millis()
        );
        Ok(summary)
    }
}
