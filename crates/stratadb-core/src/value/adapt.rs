use crate::{
    model::{PropertyKind, PropertyModel},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// ValueError
///
/// Adaptation failures when a supplied value meets a declared property.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValueError {
    #[error("cannot convert {from} value to {to} property '{property}'")]
    TypeMismatch { property: &'static str, from: &'static str, to: &'static str },

    #[error("null supplied for non-nullable property '{property}'")]
    NullNotAllowed { property: &'static str },
}

impl Value {
    /// Adapt a supplied value to a property's declared kind.
    ///
    /// The conversion table is fixed: signed widening `i8→i16→i32→i64`,
    /// unsigned widening `u8→u16→u32→u64`, `f32→f64`, `char→text`, and null
    /// into nullable columns. Anything else is a type mismatch.
    pub fn adapt_to(self, property: &'static PropertyModel) -> Result<Self, ValueError> {
        let mismatch = |value: &Self| ValueError::TypeMismatch {
            property: property.name,
            from: value.label(),
            to: property.kind.label(),
        };

        if self.is_null() {
            if property.nullable {
                return Ok(Self::Null);
            }
            return Err(ValueError::NullNotAllowed { property: property.name });
        }

        match (property.kind, self) {
            (PropertyKind::Bool, v @ Self::Bool(_))
            | (PropertyKind::I8, v @ Self::I8(_))
            | (PropertyKind::U8, v @ Self::U8(_))
            | (PropertyKind::F32, v @ Self::F32(_))
            | (PropertyKind::Char, v @ Self::Char(_))
            | (PropertyKind::Text, v @ Self::Text(_))
            | (PropertyKind::Blob, v @ Self::Blob(_))
            | (PropertyKind::Lob, v @ Self::Lob(_)) => Ok(v),

            (PropertyKind::I16, Self::I8(v)) => Ok(Self::I16(v.into())),
            (PropertyKind::I16, v @ Self::I16(_)) => Ok(v),

            (PropertyKind::I32, Self::I8(v)) => Ok(Self::I32(v.into())),
            (PropertyKind::I32, Self::I16(v)) => Ok(Self::I32(v.into())),
            (PropertyKind::I32, v @ Self::I32(_)) => Ok(v),

            (PropertyKind::I64, Self::I8(v)) => Ok(Self::I64(v.into())),
            (PropertyKind::I64, Self::I16(v)) => Ok(Self::I64(v.into())),
            (PropertyKind::I64, Self::I32(v)) => Ok(Self::I64(v.into())),
            (PropertyKind::I64, v @ Self::I64(_)) => Ok(v),

            (PropertyKind::U16, Self::U8(v)) => Ok(Self::U16(v.into())),
            (PropertyKind::U16, v @ Self::U16(_)) => Ok(v),

            (PropertyKind::U32, Self::U8(v)) => Ok(Self::U32(v.into())),
            (PropertyKind::U32, Self::U16(v)) => Ok(Self::U32(v.into())),
            (PropertyKind::U32, v @ Self::U32(_)) => Ok(v),

            (PropertyKind::U64, Self::U8(v)) => Ok(Self::U64(v.into())),
            (PropertyKind::U64, Self::U16(v)) => Ok(Self::U64(v.into())),
            (PropertyKind::U64, Self::U32(v)) => Ok(Self::U64(v.into())),
            (PropertyKind::U64, v @ Self::U64(_)) => Ok(v),

            (PropertyKind::F64, Self::F32(v)) => Ok(Self::F64(v.into())),
            (PropertyKind::F64, v @ Self::F64(_)) => Ok(v),

            (PropertyKind::Text, Self::Char(v)) => Ok(Self::Text(v.to_string())),

            (_, v) => Err(mismatch(&v)),
        }
    }
}
