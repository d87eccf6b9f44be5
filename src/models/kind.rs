//! Record kinds and the descriptor table that drives import and export.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three record kinds managed by framedex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A playable character (primary entity).
    Character,
    /// A move category such as "special" or "throw".
    MoveCategory,
    /// A move belonging to one character and one category.
    Move,
}

impl RecordKind {
    /// Returns all record kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Character, Self::MoveCategory, Self::Move]
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::MoveCategory => "move_category",
            Self::Move => "move",
        }
    }

    /// Returns the store type name (`Character`, `MoveCategory`, `Move`).
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Character => "Character",
            Self::MoveCategory => "MoveCategory",
            Self::Move => "Move",
        }
    }

    /// Returns the pluralized store type name used by list operations.
    #[must_use]
    pub const fn plural_type_name(&self) -> &'static str {
        match self {
            Self::Character => "Characters",
            Self::MoveCategory => "MoveCategories",
            Self::Move => "Moves",
        }
    }

    /// Parses a kind string.
    ///
    /// Returns `None` if the kind is not recognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" | "characters" | "primary" => Some(Self::Character),
            "move_category" | "move-category" | "movecategory" | "move_categories"
            | "category" | "categories" => Some(Self::MoveCategory),
            "move" | "moves" | "dependent" => Some(Self::Move),
            _ => None,
        }
    }

    /// Returns the descriptor for this kind.
    #[must_use]
    pub fn descriptor(&self) -> &'static KindDescriptor {
        match self {
            Self::Character => &CHARACTER,
            Self::MoveCategory => &MOVE_CATEGORY,
            Self::Move => &MOVE,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| {
            crate::Error::InvalidInput(format!(
                "unknown record kind '{s}' (expected character, move_category or move)"
            ))
        })
    }
}

/// Scalar field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text; blank becomes absent.
    Text,
    /// Base-10 integer; blank or unparsable becomes absent.
    Integer,
}

/// One scalar column of a record kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical column and store field name.
    pub name: &'static str,
    /// Alternative CSV header names accepted on import.
    pub aliases: &'static [&'static str],
    /// Value type.
    pub ty: FieldType,
}

impl FieldSpec {
    const fn text(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            ty: FieldType::Text,
        }
    }

    const fn integer(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            ty: FieldType::Integer,
        }
    }
}

/// An array field collapsed from indexed CSV columns (`prefix_1..prefix_N`).
#[derive(Debug, Clone, Copy)]
pub struct ArrayFieldGroup {
    /// Store field receiving the collapsed list.
    pub target: &'static str,
    /// Canonical column prefix.
    pub prefix: &'static str,
    /// Alternative column prefix accepted on import.
    pub alias_prefix: &'static str,
    /// Number of indexed columns.
    pub width: usize,
}

impl ArrayFieldGroup {
    /// Returns the canonical column name for a 1-based slot.
    #[must_use]
    pub fn column(&self, slot: usize) -> String {
        format!("{}_{slot}", self.prefix)
    }

    /// Returns all canonical column names of the group, in slot order.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        (1..=self.width).map(|slot| self.column(slot)).collect()
    }

    /// Maps a header to its 1-based slot if it belongs to this group.
    fn slot_of(&self, header: &str) -> Option<usize> {
        [self.prefix, self.alias_prefix].iter().find_map(|prefix| {
            header
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|slot| (1..=self.width).contains(slot))
        })
    }
}

/// How a foreign key is checked and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Natural key must exist; the natural key itself is stored.
    Presence,
    /// Natural key must exist; the target's internal identifier is stored.
    InternalId,
}

/// A foreign key from one kind to another.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    /// Column holding the target's natural key.
    pub field: &'static str,
    /// Target record kind.
    pub target: RecordKind,
    /// How the key is stored once resolved.
    pub resolution: Resolution,
}

/// Per-kind configuration consumed by the generic import/export routines.
#[derive(Debug)]
pub struct KindDescriptor {
    /// The kind described.
    pub kind: RecordKind,
    /// Column holding the natural key.
    pub natural_key: &'static str,
    /// Columns that must be present and non-blank.
    pub required: &'static [&'static str],
    /// Scalar columns, in canonical header order.
    pub fields: &'static [FieldSpec],
    /// Array columns collapsed from indexed headers.
    pub array_groups: &'static [ArrayFieldGroup],
    /// Foreign keys checked against the pre-run snapshot.
    pub references: &'static [Reference],
}

impl KindDescriptor {
    /// Returns the canonical CSV headers, array groups expanded.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self.fields.iter().map(|f| f.name.to_string()).collect();
        for group in self.array_groups {
            headers.extend(group.columns());
        }
        headers
    }

    /// Maps a CSV header (case-insensitive, alias-aware) to its canonical column.
    ///
    /// Returns `None` for columns this kind does not know.
    #[must_use]
    pub fn canonical_column(&self, header: &str) -> Option<String> {
        let header = header.trim().to_lowercase();
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.name == header || f.aliases.contains(&header.as_str()))
        {
            return Some(field.name.to_string());
        }
        self.array_groups
            .iter()
            .find_map(|group| group.slot_of(&header).map(|slot| group.column(slot)))
    }

    /// Returns the store field names selected when reading records.
    #[must_use]
    pub fn store_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .map(|f| f.name)
            .chain(self.array_groups.iter().map(|g| g.target))
            .collect()
    }
}

static CHARACTER: KindDescriptor = KindDescriptor {
    kind: RecordKind::Character,
    natural_key: "character_id",
    required: &["character_id", "character_name_en"],
    fields: &[
        FieldSpec::text("character_id", &["key"]),
        FieldSpec::text("character_name_en", &["name_primary"]),
        FieldSpec::text("character_name_jp", &["name_secondary"]),
        FieldSpec::text("nickname", &["alias"]),
        FieldSpec::text("height", &["attr1"]),
        FieldSpec::text("weight", &["attr2"]),
        FieldSpec::text("nationality", &["attr3"]),
        FieldSpec::text("martial_arts", &["attr4"]),
        FieldSpec::text("character_description", &["description"]),
    ],
    array_groups: &[],
    references: &[],
};

static MOVE_CATEGORY: KindDescriptor = KindDescriptor {
    kind: RecordKind::MoveCategory,
    natural_key: "move_category_id",
    required: &["move_category_id", "move_category"],
    fields: &[
        FieldSpec::text("move_category_id", &["category_key"]),
        FieldSpec::text("move_category", &["category_label"]),
    ],
    array_groups: &[],
    references: &[],
};

static MOVE: KindDescriptor = KindDescriptor {
    kind: RecordKind::Move,
    natural_key: "move_id",
    required: &["move_id", "character_id", "move_category_id", "move_name"],
    fields: &[
        FieldSpec::text("move_id", &["record_key"]),
        FieldSpec::integer("move_num", &["seq"]),
        FieldSpec::text("character_id", &["parent_key"]),
        FieldSpec::text("move_category_id", &["category_key"]),
        FieldSpec::text("move_name", &["name"]),
        FieldSpec::text("move_name_kana", &["name_phonetic"]),
        FieldSpec::text("command", &[]),
        FieldSpec::integer("startup_frame", &["numeric_frame"]),
        FieldSpec::text("active_frame", &["range1"]),
        FieldSpec::text("hit_frame", &["range2"]),
        FieldSpec::text("block_frame", &["range3"]),
        FieldSpec::text("attribute", &[]),
    ],
    array_groups: &[
        ArrayFieldGroup {
            target: "effects",
            prefix: "effect_id",
            alias_prefix: "effect",
            width: 5,
        },
        ArrayFieldGroup {
            target: "remarks",
            prefix: "remarks",
            alias_prefix: "remark",
            width: 5,
        },
    ],
    references: &[
        Reference {
            field: "character_id",
            target: RecordKind::Character,
            resolution: Resolution::Presence,
        },
        Reference {
            field: "move_category_id",
            target: RecordKind::MoveCategory,
            resolution: Resolution::InternalId,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(RecordKind::parse("character"), Some(RecordKind::Character));
        assert_eq!(RecordKind::parse("Moves"), Some(RecordKind::Move));
        assert_eq!(
            RecordKind::parse("move-category"),
            Some(RecordKind::MoveCategory)
        );
        assert_eq!(RecordKind::parse("effect"), None);
        assert!("combo".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_kind_as_str_roundtrips() {
        for kind in RecordKind::all() {
            assert_eq!(RecordKind::parse(kind.as_str()), Some(*kind));
            assert_eq!(kind.descriptor().kind, *kind);
        }
    }

    #[test]
    fn test_move_headers_expand_array_groups() {
        let headers = RecordKind::Move.descriptor().headers();
        assert_eq!(headers.len(), 12 + 5 + 5);
        assert_eq!(headers[0], "move_id");
        assert!(headers.contains(&"effect_id_1".to_string()));
        assert!(headers.contains(&"remarks_5".to_string()));
    }

    #[test]
    fn test_canonical_column_aliases() {
        let moves = RecordKind::Move.descriptor();
        assert_eq!(moves.canonical_column("parent_key").as_deref(), Some("character_id"));
        assert_eq!(moves.canonical_column(" MOVE_NAME ").as_deref(), Some("move_name"));
        assert_eq!(moves.canonical_column("effect_3").as_deref(), Some("effect_id_3"));
        assert_eq!(moves.canonical_column("remark_2").as_deref(), Some("remarks_2"));
        assert_eq!(moves.canonical_column("effect_id_6"), None);
        assert_eq!(moves.canonical_column("unknown"), None);

        let characters = RecordKind::Character.descriptor();
        assert_eq!(characters.canonical_column("key").as_deref(), Some("character_id"));
    }

    #[test]
    fn test_store_fields_include_array_targets() {
        let fields = RecordKind::Move.descriptor().store_fields();
        assert!(fields.contains(&"effects"));
        assert!(fields.contains(&"remarks"));
        assert!(!fields.contains(&"effect_id_1"));
    }
}
