//! Order-preserving key/value codec.
//!
//! Key encodings guarantee `lex(encode(a), encode(b)) == tuple_cmp(a, b)`
//! under the declared per-column direction. Descending columns are the
//! bitwise complement of their ascending form. Row (non-key) encodings
//! reuse the same primitive family behind a generation tag and a packed
//! null map.

mod key;
mod primitive;
mod row;
mod text;

#[cfg(test)]
mod tests;

pub use key::KeyLayout;
pub use row::{RowLayout, decode_generation};

use thiserror::Error as ThisError;

// Null markers. Null collates high in the column's declared direction.
pub(crate) const NOT_NULL: u8 = 0x80;
pub(crate) const NULL_HIGH: u8 = 0xFF;

// Bool domain packs into a single byte between the null markers.
pub(crate) const BOOL_FALSE: u8 = 0x7E;
pub(crate) const BOOL_TRUE: u8 = 0x7F;

///
/// CodecError
///
/// Byte-level encode/decode failures.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CodecError {
    #[error("corrupt encoding: {message}")]
    Corrupt { message: String },

    #[error("truncated encoding: {expected} more bytes expected")]
    Truncated { expected: usize },

    #[error("value kind '{kind}' is not encodable: {reason}")]
    Unsupported { kind: &'static str, reason: &'static str },

    #[error("{found} value cannot encode into {expected} column '{column}'")]
    ColumnMismatch { column: &'static str, expected: &'static str, found: &'static str },

    #[error("null in non-nullable column '{column}'")]
    NullColumn { column: &'static str },

    #[error("column count mismatch: layout has {expected}, caller supplied {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("generation tag {generation} exceeds the encodable range")]
    GenerationRange { generation: u32 },

    #[error("row generation {found} does not match layout generation {expected}")]
    GenerationMismatch { expected: u32, found: u32 },
}

impl CodecError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt { message: message.into() }
    }
}

///
/// ByteReader
///
/// Forward reader over one encoded buffer. Descending columns read through
/// the complement transform.
///

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn peek(&self, desc: bool) -> Result<u8, CodecError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(CodecError::Truncated { expected: 1 })?;
        Ok(if desc { !byte } else { byte })
    }

    pub(crate) fn byte(&mut self, desc: bool) -> Result<u8, CodecError> {
        let byte = self.peek(desc)?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn array<const N: usize>(&mut self, desc: bool) -> Result<[u8; N], CodecError> {
        if self.remaining() < N {
            return Err(CodecError::Truncated { expected: N - self.remaining() });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        if desc {
            for byte in &mut out {
                *byte = !*byte;
            }
        }
        Ok(out)
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<(), CodecError> {
        if self.remaining() < count {
            return Err(CodecError::Truncated { expected: count - self.remaining() });
        }
        self.pos += count;
        Ok(())
    }
}
