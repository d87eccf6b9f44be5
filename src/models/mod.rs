//! Data models for framedex.
//!
//! Record kinds, their per-kind descriptors, and the typed field sets that
//! flow between the CSV layer and the record store.

mod kind;
mod record;

pub use kind::{
    ArrayFieldGroup, FieldSpec, FieldType, KindDescriptor, RecordKind, Reference, Resolution,
};
pub use record::{Character, Move, MoveCategory, RecordFields, RecordId, StoredRecord};
