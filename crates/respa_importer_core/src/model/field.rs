//! Field metadata and typed field values for importable records.
//!
//! # Responsibility
//! - Describe which fields a record exposes to importers and how they are typed.
//! - Describe translated fields and their per-language concrete fields.
//! - Convert untyped payload values into typed `FieldValue`s.
//!
//! # Invariants
//! - Every concrete field of a translated field is also listed in `fields`.
//! - Length limits apply to `FieldKind::Char` only.

use crate::geo::Point;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bounded text; values longer than `max_length` characters are rejected.
    Char { max_length: usize },
    /// Unbounded text.
    Text,
    /// Spatial point.
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

/// A translated field and its concrete per-language fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedField {
    pub name: &'static str,
    /// `(language code, concrete field name)` pairs.
    pub languages: &'static [(&'static str, &'static str)],
}

/// Static description of one model.
#[derive(Debug)]
pub struct ModelMeta {
    pub fields: &'static [FieldMeta],
    pub translations: &'static [TranslatedField],
}

impl ModelMeta {
    pub fn field(&self, name: &str) -> Option<&'static FieldMeta> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn translation(&self, name: &str) -> Option<&'static TranslatedField> {
        self.translations.iter().find(|field| field.name == name)
    }
}

/// Typed value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Point(Point),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn from_opt_text(value: Option<&str>) -> Self {
        match value {
            Some(text) => Self::Text(text.to_string()),
            None => Self::Null,
        }
    }

    /// Converts an untyped payload value according to the field kind.
    ///
    /// Text kinds accept strings and numbers; point kinds accept
    /// `{ "srid", "x", "y" }` objects. `null` is accepted for any kind.
    pub fn from_payload(kind: FieldKind, value: &Value) -> Result<Self, FieldValueError> {
        if value.is_null() {
            return Ok(Self::Null);
        }
        match kind {
            FieldKind::Char { .. } | FieldKind::Text => match value {
                Value::String(text) => Ok(Self::Text(text.clone())),
                Value::Number(number) => Ok(Self::Text(number.to_string())),
                other => Err(FieldValueError::TypeMismatch {
                    expected: "text",
                    found: json_type_name(other),
                }),
            },
            FieldKind::Point => serde_json::from_value::<Point>(value.clone())
                .map(Self::Point)
                .map_err(|err| FieldValueError::InvalidPoint(err.to_string())),
        }
    }

    pub fn into_text(self) -> Result<Option<String>, FieldValueError> {
        match self {
            Self::Null => Ok(None),
            Self::Text(text) => Ok(Some(text)),
            Self::Point(_) => Err(FieldValueError::TypeMismatch {
                expected: "text",
                found: "point",
            }),
        }
    }

    pub fn into_point(self) -> Result<Option<Point>, FieldValueError> {
        match self {
            Self::Null => Ok(None),
            Self::Point(point) => Ok(Some(point)),
            Self::Text(_) => Err(FieldValueError::TypeMismatch {
                expected: "point",
                found: "text",
            }),
        }
    }
}

/// Errors raised while reading or writing typed field values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValueError {
    UnknownField(String),
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    InvalidPoint(String),
    NotNullable(String),
}

impl Display for FieldValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "unknown field `{name}`"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
            Self::InvalidPoint(message) => write!(f, "invalid point value: {message}"),
            Self::NotNullable(name) => write!(f, "field `{name}` cannot be null"),
        }
    }
}

impl Error for FieldValueError {}

/// Record types whose fields can be reconciled against import payloads.
pub trait Model {
    fn meta() -> &'static ModelMeta;

    /// Returns the current value of a concrete field, or `None` when the
    /// model has no such field.
    fn field_value(&self, name: &str) -> Option<FieldValue>;

    fn set_field_value(&mut self, name: &str, value: FieldValue) -> Result<(), FieldValueError>;
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
