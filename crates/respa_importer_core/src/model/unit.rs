//! Unit and unit identifier domain model.
//!
//! # Responsibility
//! - Define the `Unit` record (a bookable location or organisational entity).
//! - Define secondary identifiers scoped by namespace.
//! - Expose unit fields through the `Model` trait for payload reconciliation.
//!
//! # Invariants
//! - `id` is stable once the unit is persisted.
//! - A unit has at most one identifier per namespace.
//! - `time_zone` is never null.

use crate::geo::Point;
use crate::model::field::{
    FieldKind, FieldMeta, FieldValue, FieldValueError, Model, ModelMeta, TranslatedField,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type UnitId = String;

pub const DEFAULT_TIME_ZONE: &str = "Europe/Helsinki";

/// Languages every translated unit field is stored in.
pub const UNIT_LANGUAGES: &[&str] = &["fi", "sv", "en"];

const fn char_field(name: &'static str, max_length: usize) -> FieldMeta {
    FieldMeta {
        name,
        kind: FieldKind::Char { max_length },
        nullable: true,
    }
}

const fn text_field(name: &'static str) -> FieldMeta {
    FieldMeta {
        name,
        kind: FieldKind::Text,
        nullable: true,
    }
}

const UNIT_FIELDS: &[FieldMeta] = &[
    FieldMeta {
        name: "id",
        kind: FieldKind::Char { max_length: 50 },
        nullable: false,
    },
    char_field("name_fi", 200),
    char_field("name_sv", 200),
    char_field("name_en", 200),
    text_field("description_fi"),
    text_field("description_sv"),
    text_field("description_en"),
    char_field("street_address_fi", 100),
    char_field("street_address_sv", 100),
    char_field("street_address_en", 100),
    char_field("www_url_fi", 400),
    char_field("www_url_sv", 400),
    char_field("www_url_en", 400),
    char_field("picture_caption_fi", 200),
    char_field("picture_caption_sv", 200),
    char_field("picture_caption_en", 200),
    char_field("address_zip", 10),
    char_field("phone", 30),
    char_field("email", 100),
    char_field("address_postal_full", 100),
    char_field("manager_email", 100),
    char_field("picture_url", 200),
    FieldMeta {
        name: "time_zone",
        kind: FieldKind::Char { max_length: 50 },
        nullable: false,
    },
    FieldMeta {
        name: "location",
        kind: FieldKind::Point,
        nullable: true,
    },
];

const UNIT_TRANSLATIONS: &[TranslatedField] = &[
    TranslatedField {
        name: "name",
        languages: &[("fi", "name_fi"), ("sv", "name_sv"), ("en", "name_en")],
    },
    TranslatedField {
        name: "description",
        languages: &[
            ("fi", "description_fi"),
            ("sv", "description_sv"),
            ("en", "description_en"),
        ],
    },
    TranslatedField {
        name: "street_address",
        languages: &[
            ("fi", "street_address_fi"),
            ("sv", "street_address_sv"),
            ("en", "street_address_en"),
        ],
    },
    TranslatedField {
        name: "www_url",
        languages: &[
            ("fi", "www_url_fi"),
            ("sv", "www_url_sv"),
            ("en", "www_url_en"),
        ],
    },
    TranslatedField {
        name: "picture_caption",
        languages: &[
            ("fi", "picture_caption_fi"),
            ("sv", "picture_caption_sv"),
            ("en", "picture_caption_en"),
        ],
    },
];

static UNIT_META: ModelMeta = ModelMeta {
    fields: UNIT_FIELDS,
    translations: UNIT_TRANSLATIONS,
};

/// Text stored once per supported language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedText {
    pub fi: Option<String>,
    pub sv: Option<String>,
    pub en: Option<String>,
}

impl TranslatedText {
    pub fn get(&self, lang: &str) -> Option<&str> {
        match lang {
            "fi" => self.fi.as_deref(),
            "sv" => self.sv.as_deref(),
            "en" => self.en.as_deref(),
            _ => None,
        }
    }

    fn slot_mut(&mut self, lang: &str) -> Option<&mut Option<String>> {
        match lang {
            "fi" => Some(&mut self.fi),
            "sv" => Some(&mut self.sv),
            "en" => Some(&mut self.en),
            _ => None,
        }
    }

    /// First non-empty translation in `UNIT_LANGUAGES` order.
    pub fn first_available(&self) -> Option<&str> {
        UNIT_LANGUAGES
            .iter()
            .filter_map(|lang| self.get(lang))
            .find(|text| !text.is_empty())
    }
}

/// A named physical location or organisational entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: TranslatedText,
    pub description: TranslatedText,
    pub street_address: TranslatedText,
    pub www_url: TranslatedText,
    pub picture_caption: TranslatedText,
    pub address_zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address_postal_full: Option<String>,
    pub manager_email: Option<String>,
    pub picture_url: Option<String>,
    pub time_zone: String,
    /// Stored in the application projection.
    pub location: Option<Point>,
    /// Epoch milliseconds, maintained by the repository.
    pub created_at: Option<i64>,
    /// Epoch milliseconds, maintained by the repository.
    pub modified_at: Option<i64>,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: TranslatedText::default(),
            description: TranslatedText::default(),
            street_address: TranslatedText::default(),
            www_url: TranslatedText::default(),
            picture_caption: TranslatedText::default(),
            address_zip: None,
            phone: None,
            email: None,
            address_postal_full: None,
            manager_email: None,
            picture_url: None,
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            location: None,
            created_at: None,
            modified_at: None,
        }
    }
}

impl Unit {
    pub fn with_id(id: impl Into<UnitId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    fn translated(&self, base: &str) -> Option<&TranslatedText> {
        match base {
            "name" => Some(&self.name),
            "description" => Some(&self.description),
            "street_address" => Some(&self.street_address),
            "www_url" => Some(&self.www_url),
            "picture_caption" => Some(&self.picture_caption),
            _ => None,
        }
    }

    fn translated_mut(&mut self, base: &str) -> Option<&mut TranslatedText> {
        match base {
            "name" => Some(&mut self.name),
            "description" => Some(&mut self.description),
            "street_address" => Some(&mut self.street_address),
            "www_url" => Some(&mut self.www_url),
            "picture_caption" => Some(&mut self.picture_caption),
            _ => None,
        }
    }

    fn plain_text_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "address_zip" => Some(&mut self.address_zip),
            "phone" => Some(&mut self.phone),
            "email" => Some(&mut self.email),
            "address_postal_full" => Some(&mut self.address_postal_full),
            "manager_email" => Some(&mut self.manager_email),
            "picture_url" => Some(&mut self.picture_url),
            _ => None,
        }
    }
}

/// Splits `name_fi` into `("name", "fi")` for known translated fields.
fn split_translated(name: &str) -> Option<(&str, &str)> {
    let (base, lang) = name.rsplit_once('_')?;
    if UNIT_LANGUAGES.contains(&lang) && UNIT_META.translation(base).is_some() {
        Some((base, lang))
    } else {
        None
    }
}

impl Model for Unit {
    fn meta() -> &'static ModelMeta {
        &UNIT_META
    }

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        if let Some((base, lang)) = split_translated(name) {
            let text = self.translated(base)?;
            return Some(FieldValue::from_opt_text(text.get(lang)));
        }
        let value = match name {
            "id" => FieldValue::Text(self.id.clone()),
            "address_zip" => FieldValue::from_opt_text(self.address_zip.as_deref()),
            "phone" => FieldValue::from_opt_text(self.phone.as_deref()),
            "email" => FieldValue::from_opt_text(self.email.as_deref()),
            "address_postal_full" => {
                FieldValue::from_opt_text(self.address_postal_full.as_deref())
            }
            "manager_email" => FieldValue::from_opt_text(self.manager_email.as_deref()),
            "picture_url" => FieldValue::from_opt_text(self.picture_url.as_deref()),
            "time_zone" => FieldValue::Text(self.time_zone.clone()),
            "location" => match self.location {
                Some(point) => FieldValue::Point(point),
                None => FieldValue::Null,
            },
            _ => return None,
        };
        Some(value)
    }

    fn set_field_value(&mut self, name: &str, value: FieldValue) -> Result<(), FieldValueError> {
        if let Some((base, lang)) = split_translated(name) {
            let text = value.into_text()?;
            let slot = self
                .translated_mut(base)
                .and_then(|translated| translated.slot_mut(lang))
                .ok_or_else(|| FieldValueError::UnknownField(name.to_string()))?;
            *slot = text;
            return Ok(());
        }

        match name {
            "id" => {
                self.id = value
                    .into_text()?
                    .ok_or_else(|| FieldValueError::NotNullable(name.to_string()))?;
            }
            "time_zone" => {
                self.time_zone = value
                    .into_text()?
                    .ok_or_else(|| FieldValueError::NotNullable(name.to_string()))?;
            }
            "location" => self.location = value.into_point()?,
            other => {
                let text = value.into_text()?;
                let slot = self
                    .plain_text_mut(other)
                    .ok_or_else(|| FieldValueError::UnknownField(other.to_string()))?;
                *slot = text;
            }
        }
        Ok(())
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name.first_available() {
            Some(name) => write!(f, "{name} ({})", self.id),
            None => write!(f, "({})", self.id),
        }
    }
}

/// Secondary key of a unit, unique per `(unit_id, namespace)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentifier {
    pub unit_id: UnitId,
    pub namespace: String,
    pub value: String,
}

impl UnitIdentifier {
    pub fn new(
        unit_id: impl Into<UnitId>,
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            namespace: namespace.into(),
            value: value.into(),
        }
    }
}
