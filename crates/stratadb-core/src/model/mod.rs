//! Record descriptors consumed by the filter algebra and the codec.
//!
//! Descriptors are `&'static` values, either hand-written or produced by a
//! build-time generator. Identity is pointer identity: two filters range
//! over "the same record type" iff their `RecordModel` pointers are equal.

mod chain;

pub use chain::{ChainSegment, ChainedProperty};

use std::{fmt, ptr};
use thiserror::Error as ThisError;

///
/// RecordModel
/// Minimal runtime model for one record type.
///

pub struct RecordModel {
    /// Stable record-type name used in diagnostics and routing.
    pub name: &'static str,
    /// Ordered property list (authoritative for codec layout).
    pub properties: &'static [PropertyModel],
    /// Declared primary-key sequence with per-column direction.
    pub primary_key: &'static [KeyPart],
}

impl RecordModel {
    /// Look up one property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'static PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Primary-key parts resolved against this model's property list.
    ///
    /// Returns `InvalidProperty` if a key part names an unknown property.
    pub fn key_properties(
        &'static self,
    ) -> Result<Vec<(&'static PropertyModel, Direction)>, InvalidProperty> {
        self.primary_key
            .iter()
            .map(|part| {
                self.property(part.property)
                    .map(|p| (p, part.direction))
                    .ok_or_else(|| InvalidProperty::NotFound {
                        record: self.name,
                        property: part.property.to_string(),
                    })
            })
            .collect()
    }

    /// Stored non-key properties in declared order: joins and derived
    /// properties never persist.
    ///
    /// This is the layout the row codec encodes.
    #[must_use]
    pub fn data_properties(&'static self) -> Vec<&'static PropertyModel> {
        self.properties
            .iter()
            .filter(|p| !p.kind.is_join() && !p.derived && !self.is_key_property(p.name))
            .collect()
    }

    #[must_use]
    pub fn is_key_property(&self, name: &str) -> bool {
        self.primary_key.iter().any(|part| part.property == name)
    }

    /// Pointer identity of `&'static` models.
    #[must_use]
    pub fn same_as(&'static self, other: &'static Self) -> bool {
        ptr::eq(self, other)
    }
}

impl fmt::Debug for RecordModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordModel").field("name", &self.name).finish_non_exhaustive()
    }
}

///
/// PropertyModel
///
/// Runtime property metadata: the smallest unit consumed by filter
/// validation, binding, and codec layout.
///

pub struct PropertyModel {
    /// Property name as used in filters and key declarations.
    pub name: &'static str,
    /// Runtime type shape.
    pub kind: PropertyKind,
    /// Whether the column admits null.
    pub nullable: bool,
    /// Derived properties are filterable but never stored.
    pub derived: bool,
}

impl PropertyModel {
    #[must_use]
    pub const fn join_target(&self) -> Option<&'static RecordModel> {
        match self.kind {
            PropertyKind::Join { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Debug for PropertyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyModel")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

///
/// PropertyKind
///
/// Minimal runtime type surface needed by filter validation and the codec.
/// Aligned with `Value` variants and intentionally lossy: it encodes only
/// the shape required for adaptation and key layout.
///

#[derive(Clone, Copy, Debug)]
pub enum PropertyKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    Text,
    Blob,
    /// Large object; stored as a locator handle, never inline.
    Lob,

    /// Typed record reference traversed by chained properties.
    Join {
        target: &'static RecordModel,
        /// One-to-many joins admit `Exists` filters; many-to-one joins
        /// flatten into plain chained properties.
        to_many: bool,
    },
}

impl PropertyKind {
    #[must_use]
    pub const fn is_join(&self) -> bool {
        matches!(self, Self::Join { .. })
    }

    #[must_use]
    pub const fn is_to_many_join(&self) -> bool {
        matches!(self, Self::Join { to_many: true, .. })
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Lob => "lob",
            Self::Join { .. } => "join",
        }
    }
}

///
/// KeyPart
///
/// One declared primary-key column with its scan direction.
///

#[derive(Clone, Copy, Debug)]
pub struct KeyPart {
    pub property: &'static str,
    pub direction: Direction,
}

///
/// Direction
///
/// Declared ordering of one key column. Descending columns encode as the
/// bitwise complement of their ascending form.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    #[must_use]
    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }
}

///
/// InvalidProperty
///
/// Property resolution failures surfaced by descriptors and chains.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum InvalidProperty {
    #[error("property '{property}' not found on record type '{record}'")]
    NotFound { record: &'static str, property: String },

    #[error("property '{property}' on '{record}' is not a join and cannot be chained through")]
    NotAJoin { record: &'static str, property: &'static str },

    #[error("outer-join marker on non-join property '{property}' of '{record}'")]
    OuterOnNonJoin { record: &'static str, property: &'static str },

    #[error("outer-join marker is not allowed on the last segment '{property}'")]
    OuterOnLastSegment { property: &'static str },

    #[error("chained property must not be empty")]
    EmptyChain,
}
