//! Error type shared by importers and reconciliation helpers.

use crate::geo::GeoError;
use crate::importer::registry::RegistryError;
use crate::model::field::FieldValueError;
use crate::repo::unit_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug)]
pub enum ImportError {
    /// No data path contains the requested file.
    DataFileNotFound(String),
    /// Text value exceeds the field's maximum length.
    FieldTooLong {
        field: String,
        max_length: usize,
        value: String,
    },
    /// Payload value cannot be applied to the named field.
    Field {
        field: String,
        source: FieldValueError,
    },
    /// Payload is not shaped like an import record.
    InvalidPayload(String),
    /// Payload `id` disagrees with the record it was matched to.
    IdentityMismatch { existing: String, payload: String },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse { path: PathBuf, message: String },
    Geo(GeoError),
    Repo(RepoError),
    Registry(RegistryError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataFileNotFound(name) => write!(f, "Data file '{name}' not found"),
            Self::FieldTooLong {
                field,
                max_length,
                value,
            } => write!(f, "field '{field}' too long (max. {max_length}): {value}"),
            Self::Field { field, source } => write!(f, "field '{field}': {source}"),
            Self::InvalidPayload(message) => write!(f, "invalid import payload: {message}"),
            Self::IdentityMismatch { existing, payload } => write!(
                f,
                "payload id `{payload}` does not match existing unit `{existing}`"
            ),
            Self::Io { path, source } => write!(f, "failed to read `{}`: {source}", path.display()),
            Self::Parse { path, message } => {
                write!(f, "failed to parse `{}`: {message}", path.display())
            }
            Self::Geo(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Geo(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::DataFileNotFound(_)
            | Self::FieldTooLong { .. }
            | Self::InvalidPayload(_)
            | Self::IdentityMismatch { .. }
            | Self::Parse { .. } => None,
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<GeoError> for ImportError {
    fn from(value: GeoError) -> Self {
        Self::Geo(value)
    }
}

impl From<RegistryError> for ImportError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}
