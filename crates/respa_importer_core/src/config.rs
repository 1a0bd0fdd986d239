//! Importer settings.
//!
//! # Responsibility
//! - Load settings from an optional TOML file.
//! - Apply `RESPA_*` environment overrides on top.
//!
//! # Invariants
//! - `projection_srid` names a supported spatial reference.
//! - `log_level` is one of `trace|debug|info|warn|error`.

use crate::geo::{SpatialReference, PROJECTION_SRID};
use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_PROJECT_ROOT: &str = "RESPA_PROJECT_ROOT";
pub const ENV_DATABASE_PATH: &str = "RESPA_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "RESPA_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "RESPA_LOG_DIR";

const DEFAULT_DATABASE_FILE: &str = "respa.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                message,
            } => write!(f, "invalid settings file `{}`: {message}", path.display()),
            Self::Parse {
                path: None,
                message,
            } => write!(f, "invalid settings: {message}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } | Self::Invalid(_) => None,
        }
    }
}

/// Values the importer reads from deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the deployment; data files live in `<root>/data`.
    pub project_root: Option<PathBuf>,
    /// Fallback root when `project_root` is not set.
    pub base_dir: PathBuf,
    pub database_path: PathBuf,
    pub projection_srid: u32,
    pub log_level: String,
    /// Rolling log files are written here; stderr logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: None,
            base_dir: PathBuf::from("."),
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            projection_srid: PROJECTION_SRID,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (when given) and the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: None,
            message: err.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overrides fields from `RESPA_*` variables; empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(root) = lookup(ENV_PROJECT_ROOT) {
            self.project_root = Some(PathBuf::from(root));
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        SpatialReference::from_srid(self.projection_srid)
            .map_err(|err| ConfigError::Invalid(format!("projection_srid: {err}")))?;
        normalize_level(&self.log_level)
            .map_err(|err| ConfigError::Invalid(format!("log_level: {err}")))?;
        Ok(())
    }

    /// `project_root`, falling back to `base_dir`.
    pub fn root_dir(&self) -> &Path {
        self.project_root.as_deref().unwrap_or(&self.base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Settings, ENV_DATABASE_PATH, ENV_LOG_LEVEL, ENV_PROJECT_ROOT};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    #[test]
    fn defaults_use_tm35fin_and_base_dir() {
        let settings = Settings::default();
        assert_eq!(settings.projection_srid, 3067);
        assert_eq!(settings.root_dir(), Path::new("."));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parses_toml_with_partial_fields() {
        let settings = Settings::from_toml_str(
            r#"
            project_root = "/srv/respa"
            database_path = "/var/lib/respa/respa.sqlite3"
            "#,
        )
        .unwrap();
        assert_eq!(settings.root_dir(), Path::new("/srv/respa"));
        assert_eq!(
            settings.database_path,
            PathBuf::from("/var/lib/respa/respa.sqlite3")
        );
        assert_eq!(settings.projection_srid, 3067);
    }

    #[test]
    fn rejects_unknown_keys_and_unsupported_projection() {
        let err = Settings::from_toml_str("static_root = '/code/static'").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = Settings::from_toml_str("projection_srid = 2393").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("projection_srid")));
    }

    #[test]
    fn env_overrides_take_precedence_and_skip_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_PROJECT_ROOT, "/opt/respa"),
            (ENV_DATABASE_PATH, "  "),
            (ENV_LOG_LEVEL, "warn"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(settings.root_dir(), Path::new("/opt/respa"));
        assert_eq!(settings.database_path, PathBuf::from("respa.sqlite3"));
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = Settings::from_toml_str("log_level = 'loud'").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("log_level")));
    }
}
