//! Record identifiers and typed field sets.

use super::RecordKind;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Store-assigned opaque identifier of a persisted record.
///
/// Distinct from the natural key; used to address deletes and gets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new record ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stores may return `null` for fields declared required; treat it as blank.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Character master data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Natural key.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub character_id: String,
    /// English display name.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub character_name_en: String,
    /// Japanese display name.
    #[serde(default)]
    pub character_name_jp: Option<String>,
    /// Nickname.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Height, free text.
    #[serde(default)]
    pub height: Option<String>,
    /// Weight, free text.
    #[serde(default)]
    pub weight: Option<String>,
    /// Nationality.
    #[serde(default)]
    pub nationality: Option<String>,
    /// Fighting style.
    #[serde(default)]
    pub martial_arts: Option<String>,
    /// Long description.
    #[serde(default)]
    pub character_description: Option<String>,
}

/// Move category master data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCategory {
    /// Natural key.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub move_category_id: String,
    /// Display label.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub move_category: String,
}

/// Move frame data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Natural key.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub move_id: String,
    /// Ordering number within the character's move list.
    #[serde(default)]
    pub move_num: Option<i64>,
    /// Owning character's natural key.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub character_id: String,
    /// Internal identifier of the move category (not its natural key).
    #[serde(default)]
    pub move_category_id: Option<String>,
    /// Move name.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub move_name: String,
    /// Phonetic reading of the move name.
    #[serde(default)]
    pub move_name_kana: Option<String>,
    /// Input command.
    #[serde(default)]
    pub command: Option<String>,
    /// Startup frames.
    #[serde(default)]
    pub startup_frame: Option<i64>,
    /// Active frames, free text.
    #[serde(default)]
    pub active_frame: Option<String>,
    /// Frame advantage on hit, free text.
    #[serde(default)]
    pub hit_frame: Option<String>,
    /// Frame advantage on block, free text.
    #[serde(default)]
    pub block_frame: Option<String>,
    /// Attack attribute.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Effect references; `None` when no effect column was filled.
    #[serde(default)]
    pub effects: Option<Vec<String>>,
    /// Remark lines; `None` when no remark column was filled.
    #[serde(default)]
    pub remarks: Option<Vec<String>>,
}

/// Typed fields of one record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFields {
    /// Character fields.
    Character(Character),
    /// Move category fields.
    MoveCategory(MoveCategory),
    /// Move fields.
    Move(Move),
}

impl RecordFields {
    /// Returns the record kind of these fields.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Character(_) => RecordKind::Character,
            Self::MoveCategory(_) => RecordKind::MoveCategory,
            Self::Move(_) => RecordKind::Move,
        }
    }

    /// Returns the natural key, or `None` when it is blank.
    #[must_use]
    pub fn natural_key(&self) -> Option<&str> {
        let key = match self {
            Self::Character(c) => c.character_id.as_str(),
            Self::MoveCategory(c) => c.move_category_id.as_str(),
            Self::Move(m) => m.move_id.as_str(),
        };
        Some(key).filter(|k| !k.trim().is_empty())
    }

    /// Serializes the fields into a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::Character(c) => serde_json::to_value(c),
            Self::MoveCategory(c) => serde_json::to_value(c),
            Self::Move(m) => serde_json::to_value(m),
        };
        value.map_err(|e| Error::operation("serialize_record", e))
    }

    /// Deserializes fields of the given kind from a JSON object.
    ///
    /// Unknown keys (such as `id`) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the kind's shape.
    pub fn from_json(kind: RecordKind, value: serde_json::Value) -> Result<Self> {
        let fields = match kind {
            RecordKind::Character => serde_json::from_value(value).map(Self::Character),
            RecordKind::MoveCategory => serde_json::from_value(value).map(Self::MoveCategory),
            RecordKind::Move => serde_json::from_value(value).map(Self::Move),
        };
        fields.map_err(|e| Error::operation(format!("deserialize_{kind}"), e))
    }
}

/// A record as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Record fields.
    pub fields: RecordFields,
}

impl StoredRecord {
    /// Creates a stored record.
    #[must_use]
    pub const fn new(id: RecordId, fields: RecordFields) -> Self {
        Self { id, fields }
    }

    /// Returns the record kind.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.fields.kind()
    }

    /// Returns the natural key, or `None` when it is blank.
    #[must_use]
    pub fn natural_key(&self) -> Option<&str> {
        self.fields.natural_key()
    }

    /// Serializes the record as a flat JSON object with an `id` key.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut value = self.fields.to_json()?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "id".to_string(),
                serde_json::Value::String(self.id.as_str().to_string()),
            );
        }
        Ok(value)
    }

    /// Deserializes a flat JSON object with an `id` key.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or the fields do not match the kind.
    pub fn from_json(kind: RecordKind, value: serde_json::Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(RecordId::new)
            .ok_or_else(|| {
                Error::operation(format!("deserialize_{kind}"), "record has no string 'id'")
            })?;
        Ok(Self {
            id,
            fields: RecordFields::from_json(kind, value)?,
        })
    }
}
