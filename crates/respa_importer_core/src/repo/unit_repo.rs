//! Unit repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update APIs over `units` and `unit_identifiers`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Reads reject invalid persisted state (half-set locations, unknown
//!   columns) instead of masking it.
//! - Updates of missing rows return `RepoError::NotFound`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::geo::Point;
use crate::model::unit::{TranslatedText, Unit, UnitIdentifier};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Data columns of `units`, in the order `unit_values` binds them.
const UNIT_DATA_COLUMNS: &[&str] = &[
    "id",
    "name_fi",
    "name_sv",
    "name_en",
    "description_fi",
    "description_sv",
    "description_en",
    "street_address_fi",
    "street_address_sv",
    "street_address_en",
    "www_url_fi",
    "www_url_sv",
    "www_url_en",
    "picture_caption_fi",
    "picture_caption_sv",
    "picture_caption_en",
    "address_zip",
    "phone",
    "email",
    "address_postal_full",
    "manager_email",
    "picture_url",
    "time_zone",
    "location_srid",
    "location_x",
    "location_y",
];

const NOW_MS_SQL: &str = "(CAST(strftime('%s', 'now') AS INTEGER) * 1000)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for unit persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted unit data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence collaborator used by importers.
pub trait UnitRepository {
    fn get_unit(&self, id: &str) -> RepoResult<Option<Unit>>;
    fn list_units(&self) -> RepoResult<Vec<Unit>>;
    fn create_unit(&self, unit: &Unit) -> RepoResult<()>;
    fn update_unit(&self, unit: &Unit) -> RepoResult<()>;
    fn find_unit_by_identifier(&self, namespace: &str, value: &str) -> RepoResult<Option<Unit>>;
    fn list_identifiers(&self, unit_id: &str) -> RepoResult<Vec<UnitIdentifier>>;
    fn create_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()>;
    fn update_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()>;
}

/// SQLite-backed unit repository.
///
/// Works on a plain connection or on a `rusqlite::Transaction` (through
/// deref), so callers decide the transaction boundary.
pub struct SqliteUnitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitRepository<'conn> {
    /// Wraps a connection whose schema is fully migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version = current_version(conn)?;
        let required = latest_version();
        if db_version < required {
            return Err(DbError::SchemaNotReady {
                db_version,
                required,
            }
            .into());
        }
        Ok(Self { conn })
    }
}

impl UnitRepository for SqliteUnitRepository<'_> {
    fn get_unit(&self, id: &str) -> RepoResult<Option<Unit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1;", unit_select_sql()))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_unit_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_units(&self) -> RepoResult<Vec<Unit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id ASC;", unit_select_sql()))?;
        let mut rows = stmt.query([])?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_unit_row(row)?);
        }
        Ok(units)
    }

    fn create_unit(&self, unit: &Unit) -> RepoResult<()> {
        let placeholders = (1..=UNIT_DATA_COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO units ({}) VALUES ({placeholders});",
            UNIT_DATA_COLUMNS.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(unit_values(unit)))?;
        Ok(())
    }

    fn update_unit(&self, unit: &Unit) -> RepoResult<()> {
        // ?1 is the id; the remaining data columns follow in order.
        let assignments = UNIT_DATA_COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(",\n                ");
        let sql = format!(
            "UPDATE units
             SET
                {assignments},
                modified_at = {NOW_MS_SQL}
             WHERE id = ?1;"
        );

        let changed = self
            .conn
            .execute(&sql, params_from_iter(unit_values(unit)))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "unit",
                key: unit.id.clone(),
            });
        }
        Ok(())
    }

    fn find_unit_by_identifier(&self, namespace: &str, value: &str) -> RepoResult<Option<Unit>> {
        let unit_id: Option<String> = self
            .conn
            .query_row(
                "SELECT unit_id
                 FROM unit_identifiers
                 WHERE namespace = ?1 AND value = ?2
                 ORDER BY unit_id ASC
                 LIMIT 1;",
                params![namespace, value],
                |row| row.get(0),
            )
            .optional()?;

        match unit_id {
            Some(id) => self.get_unit(&id),
            None => Ok(None),
        }
    }

    fn list_identifiers(&self, unit_id: &str) -> RepoResult<Vec<UnitIdentifier>> {
        let mut stmt = self.conn.prepare(
            "SELECT unit_id, namespace, value
             FROM unit_identifiers
             WHERE unit_id = ?1
             ORDER BY namespace ASC;",
        )?;
        let identifiers = stmt
            .query_map([unit_id], |row| {
                Ok(UnitIdentifier {
                    unit_id: row.get(0)?,
                    namespace: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(identifiers)
    }

    fn create_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO unit_identifiers (unit_id, namespace, value) VALUES (?1, ?2, ?3);",
            params![
                identifier.unit_id.as_str(),
                identifier.namespace.as_str(),
                identifier.value.as_str(),
            ],
        )?;
        Ok(())
    }

    fn update_identifier(&self, identifier: &UnitIdentifier) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE unit_identifiers
             SET value = ?3
             WHERE unit_id = ?1 AND namespace = ?2;",
            params![
                identifier.unit_id.as_str(),
                identifier.namespace.as_str(),
                identifier.value.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "unit identifier",
                key: format!("{}/{}", identifier.unit_id, identifier.namespace),
            });
        }
        Ok(())
    }
}

fn unit_select_sql() -> String {
    format!(
        "SELECT {}, created_at, modified_at FROM units",
        UNIT_DATA_COLUMNS.join(", ")
    )
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

fn translated_values(text: &TranslatedText) -> [Value; 3] {
    [
        opt_text(text.fi.as_deref()),
        opt_text(text.sv.as_deref()),
        opt_text(text.en.as_deref()),
    ]
}

fn unit_values(unit: &Unit) -> Vec<Value> {
    let mut values = Vec::with_capacity(UNIT_DATA_COLUMNS.len());
    values.push(Value::Text(unit.id.clone()));
    for text in [
        &unit.name,
        &unit.description,
        &unit.street_address,
        &unit.www_url,
        &unit.picture_caption,
    ] {
        values.extend(translated_values(text));
    }
    for text in [
        &unit.address_zip,
        &unit.phone,
        &unit.email,
        &unit.address_postal_full,
        &unit.manager_email,
        &unit.picture_url,
    ] {
        values.push(opt_text(text.as_deref()));
    }
    values.push(Value::Text(unit.time_zone.clone()));
    match unit.location {
        Some(point) => {
            values.push(Value::Integer(i64::from(point.srid)));
            values.push(Value::Real(point.x));
            values.push(Value::Real(point.y));
        }
        None => values.extend([Value::Null, Value::Null, Value::Null]),
    }
    values
}

fn parse_translated(row: &Row<'_>, base: &str) -> RepoResult<TranslatedText> {
    Ok(TranslatedText {
        fi: row.get(format!("{base}_fi").as_str())?,
        sv: row.get(format!("{base}_sv").as_str())?,
        en: row.get(format!("{base}_en").as_str())?,
    })
}

fn parse_location(row: &Row<'_>, unit_id: &str) -> RepoResult<Option<Point>> {
    let srid: Option<i64> = row.get("location_srid")?;
    let x: Option<f64> = row.get("location_x")?;
    let y: Option<f64> = row.get("location_y")?;
    match (srid, x, y) {
        (None, None, None) => Ok(None),
        (Some(srid), Some(x), Some(y)) => {
            let srid = u32::try_from(srid).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid srid `{srid}` in units.location_srid for unit `{unit_id}`"
                ))
            })?;
            Ok(Some(Point::new(srid, x, y)))
        }
        _ => Err(RepoError::InvalidData(format!(
            "partially set location for unit `{unit_id}`"
        ))),
    }
}

fn parse_unit_row(row: &Row<'_>) -> RepoResult<Unit> {
    let id: String = row.get("id")?;
    let location = parse_location(row, &id)?;
    Ok(Unit {
        name: parse_translated(row, "name")?,
        description: parse_translated(row, "description")?,
        street_address: parse_translated(row, "street_address")?,
        www_url: parse_translated(row, "www_url")?,
        picture_caption: parse_translated(row, "picture_caption")?,
        address_zip: row.get("address_zip")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address_postal_full: row.get("address_postal_full")?,
        manager_email: row.get("manager_email")?,
        picture_url: row.get("picture_url")?,
        time_zone: row.get("time_zone")?,
        location,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        id,
    })
}
