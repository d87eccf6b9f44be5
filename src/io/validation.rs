//! Row validation and normalization.
//!
//! Turns one [`ImportRow`] into typed [`RecordFields`]:
//!
//! 1. coerce every column (blank text and unparsable integers become absent,
//!    indexed array columns collapse into one list);
//! 2. reject rows missing a required field;
//! 3. reject rows whose foreign keys are not in the pre-run snapshot, and
//!    translate keys stored by internal identifier.
//!
//! The duplicate check and the create call belong to the import service.

use super::reconcile::ReferenceIndex;
use super::traits::ImportRow;
use crate::models::{
    ArrayFieldGroup, FieldType, KindDescriptor, RecordFields, RecordKind, Resolution,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Why a single row was not imported.
///
/// Row errors are never fatal; they are counted and reported per row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    /// Required fields are missing or blank.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation {
        /// Every missing field, in descriptor order.
        missing: Vec<String>,
    },

    /// A foreign key does not match any record of the target kind.
    #[error("{field} \"{key}\" does not exist")]
    Reference {
        /// Column holding the foreign key.
        field: String,
        /// The unresolved natural key.
        key: String,
    },

    /// The coerced row does not fit the record shape.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// The store rejected the create call.
    #[error("{0}")]
    Store(String),
}

/// Trims a raw cell; blank becomes `None`.
#[must_use]
pub fn text_or_none(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parses a base-10 integer prefix; blank or unparsable becomes `None`.
///
/// Accepts an optional sign followed by digits and ignores anything after the
/// digits, so `"12f"` reads as 12 and `"f12"` as absent. Values outside the
/// `i64` range are absent.
#[must_use]
pub fn int_or_none(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let sign_len = trimmed.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);
    if digits.is_empty() {
        return None;
    }
    trimmed[..sign_len + digits.len()].parse().ok()
}

/// Collapses `prefix_1..prefix_N` into a list, dropping blanks.
///
/// Returns `None` when every slot is blank.
#[must_use]
pub fn collapse_group(row: &ImportRow, group: &ArrayFieldGroup) -> Option<Vec<String>> {
    let values: Vec<String> = group
        .columns()
        .iter()
        .filter_map(|column| text_or_none(row.get(column)))
        .collect();
    (!values.is_empty()).then_some(values)
}

/// Validates rows of one kind against reference snapshots.
#[derive(Debug, Clone)]
pub struct RowValidator {
    descriptor: &'static KindDescriptor,
    references: HashMap<RecordKind, ReferenceIndex>,
}

impl RowValidator {
    /// Creates a validator with no reference snapshots.
    ///
    /// A kind with foreign keys rejects every row until the referenced
    /// snapshots are supplied via [`Self::with_reference`].
    #[must_use]
    pub fn new(kind: RecordKind) -> Self {
        Self {
            descriptor: kind.descriptor(),
            references: HashMap::new(),
        }
    }

    /// Supplies the snapshot index for a referenced kind.
    #[must_use]
    pub fn with_reference(mut self, target: RecordKind, index: ReferenceIndex) -> Self {
        self.references.insert(target, index);
        self
    }

    /// Returns the kinds this validator resolves foreign keys against.
    #[must_use]
    pub fn referenced_kinds(&self) -> Vec<RecordKind> {
        let mut kinds: Vec<RecordKind> = Vec::new();
        for reference in self.descriptor.references {
            if !kinds.contains(&reference.target) {
                kinds.push(reference.target);
            }
        }
        kinds
    }

    /// Validates one row and builds its record fields.
    ///
    /// Checks run in order: required fields, then foreign keys.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`RowError`].
    pub fn validate(&self, row: &ImportRow) -> Result<RecordFields, RowError> {
        let mut object = self.coerce(row);

        let missing: Vec<String> = self
            .descriptor
            .required
            .iter()
            .filter(|field| object.get(**field).is_none_or(Value::is_null))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(RowError::Validation { missing });
        }

        for reference in self.descriptor.references {
            let Some(key) = object
                .get(reference.field)
                .and_then(Value::as_str)
                .map(ToString::to_string)
            else {
                continue;
            };
            let resolved = self
                .references
                .get(&reference.target)
                .and_then(|index| index.resolve(&key));
            let Some(id) = resolved else {
                return Err(RowError::Reference {
                    field: reference.field.to_string(),
                    key,
                });
            };
            if reference.resolution == Resolution::InternalId {
                object.insert(
                    reference.field.to_string(),
                    Value::String(id.as_str().to_string()),
                );
            }
        }

        RecordFields::from_json(self.descriptor.kind, Value::Object(object))
            .map_err(|e| RowError::Invalid(e.to_string()))
    }

    fn coerce(&self, row: &ImportRow) -> Map<String, Value> {
        let mut object = Map::new();
        for field in self.descriptor.fields {
            let raw = row.get(field.name);
            let value = match field.ty {
                FieldType::Text => text_or_none(raw).map(Value::String),
                FieldType::Integer => int_or_none(raw).map(Value::from),
            };
            object.insert(field.name.to_string(), value.unwrap_or(Value::Null));
        }
        for group in self.descriptor.array_groups {
            let value = collapse_group(row, group)
                .map(|values| Value::Array(values.into_iter().map(Value::String).collect()));
            object.insert(group.target.to_string(), value.unwrap_or(Value::Null));
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Character, MoveCategory, RecordId, StoredRecord};
    use test_case::test_case;

    #[test_case(Some("12") => Some(12); "plain")]
    #[test_case(Some(" -7 ") => Some(-7); "signed and padded")]
    #[test_case(Some("+3") => Some(3); "plus sign")]
    #[test_case(Some("12f") => Some(12); "trailing garbage")]
    #[test_case(Some("f12") => None; "leading garbage")]
    #[test_case(Some("--1") => None; "double sign")]
    #[test_case(Some("-") => None; "sign only")]
    #[test_case(Some("") => None; "blank")]
    #[test_case(None => None; "absent")]
    #[test_case(Some("99999999999999999999") => None; "overflow")]
    fn test_int_or_none(raw: Option<&str>) -> Option<i64> {
        int_or_none(raw)
    }

    #[test_case(Some("  Ryu ") => Some("Ryu".to_string()); "trimmed")]
    #[test_case(Some("   ") => None; "whitespace")]
    #[test_case(None => None; "absent")]
    fn test_text_or_none(raw: Option<&str>) -> Option<String> {
        text_or_none(raw)
    }

    fn snapshot_validator() -> RowValidator {
        let characters = [StoredRecord::new(
            RecordId::new("c-1"),
            RecordFields::Character(Character {
                character_id: "ryu".to_string(),
                character_name_en: "Ryu".to_string(),
                ..Character::default()
            }),
        )];
        let categories = [StoredRecord::new(
            RecordId::new("cat-9"),
            RecordFields::MoveCategory(MoveCategory {
                move_category_id: "normal".to_string(),
                move_category: "Normal".to_string(),
            }),
        )];
        RowValidator::new(RecordKind::Move)
            .with_reference(
                RecordKind::Character,
                ReferenceIndex::from_records(&characters),
            )
            .with_reference(
                RecordKind::MoveCategory,
                ReferenceIndex::from_records(&categories),
            )
    }

    fn move_row() -> ImportRow {
        ImportRow::new()
            .with("move_id", "m1")
            .with("character_id", "ryu")
            .with("move_category_id", "normal")
            .with("move_name", "Jab")
    }

    #[test]
    fn test_move_resolves_category_to_internal_id() {
        let fields = snapshot_validator()
            .validate(&move_row().with("move_num", "4").with("startup_frame", "x"))
            .unwrap();
        let RecordFields::Move(m) = fields else {
            panic!("expected move fields");
        };
        assert_eq!(m.character_id, "ryu");
        assert_eq!(m.move_category_id.as_deref(), Some("cat-9"));
        assert_eq!(m.move_num, Some(4));
        assert_eq!(m.startup_frame, None);
    }

    #[test]
    fn test_effects_collapse() {
        let row = move_row()
            .with("effect_id_1", "x")
            .with("effect_id_2", "")
            .with("effect_id_3", "y");
        let RecordFields::Move(m) = snapshot_validator().validate(&row).unwrap() else {
            panic!("expected move fields");
        };
        assert_eq!(m.effects, Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(m.remarks, None);
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let row = ImportRow::new().with("move_id", "m1").with("move_name", " ");
        let err = snapshot_validator().validate(&row).unwrap_err();
        assert_eq!(
            err,
            RowError::Validation {
                missing: vec![
                    "character_id".to_string(),
                    "move_category_id".to_string(),
                    "move_name".to_string(),
                ]
            }
        );
        assert_eq!(
            err.to_string(),
            "missing required fields: character_id, move_category_id, move_name"
        );
    }

    #[test]
    fn test_required_checked_before_references() {
        let row = move_row().with("character_id", "ken").with("move_name", "");
        let err = snapshot_validator().validate(&row).unwrap_err();
        assert!(matches!(err, RowError::Validation { .. }));
    }

    #[test_case("character_id", "ken"; "unknown character")]
    #[test_case("move_category_id", "super"; "unknown category")]
    fn test_unknown_reference(field: &str, key: &str) {
        let err = snapshot_validator()
            .validate(&move_row().with(field, key))
            .unwrap_err();
        assert_eq!(
            err,
            RowError::Reference {
                field: field.to_string(),
                key: key.to_string(),
            }
        );
        assert_eq!(err.to_string(), format!("{field} \"{key}\" does not exist"));
    }

    #[test]
    fn test_missing_snapshot_rejects_references() {
        let err = RowValidator::new(RecordKind::Move)
            .validate(&move_row())
            .unwrap_err();
        assert!(matches!(err, RowError::Reference { .. }));
    }

    #[test]
    fn test_character_without_references() {
        let validator = RowValidator::new(RecordKind::Character);
        assert!(validator.referenced_kinds().is_empty());

        let row = ImportRow::new()
            .with("character_id", "chun")
            .with("character_name_en", "Chun-Li")
            .with("height", "");
        let RecordFields::Character(c) = validator.validate(&row).unwrap() else {
            panic!("expected character fields");
        };
        assert_eq!(c.character_id, "chun");
        assert_eq!(c.height, None);
    }

    #[test]
    fn test_referenced_kinds_for_moves() {
        assert_eq!(
            RowValidator::new(RecordKind::Move).referenced_kinds(),
            vec![RecordKind::Character, RecordKind::MoveCategory]
        );
    }
}
