//! Composite primary-key codec.
//!
//! Columns encode in declared order and direction; every column's encoding
//! is self-delimiting, so plain concatenation preserves tuple-lex order.
//! Nullable fixed-width columns spend one marker byte (`0x80` not-null,
//! `0xFF` null); self-delimiting columns whose lead byte can never collide
//! with the null marker omit it. Null collates high in the declared
//! direction.

use crate::{
    MAX_KEY_COLUMNS,
    codec::{ByteReader, CodecError, NOT_NULL, NULL_HIGH, primitive, text},
    model::{Direction, PropertyKind, PropertyModel, RecordModel},
    value::{LobId, Value},
};

///
/// KeyLayout
///
/// Encoding plan for one record's primary key: the resolved key columns
/// plus optional fixed prefix/suffix padding.
///

pub struct KeyLayout {
    columns: Vec<(&'static PropertyModel, Direction)>,
    prefix_padding: usize,
    suffix_padding: usize,
}

impl KeyLayout {
    /// Resolve a record's declared primary-key sequence.
    pub fn for_record(record: &'static RecordModel) -> Result<Self, CodecError> {
        let columns = record
            .key_properties()
            .map_err(|err| CodecError::corrupt(err.to_string()))?;

        if columns.len() > MAX_KEY_COLUMNS {
            return Err(CodecError::Unsupported {
                kind: "key",
                reason: "too many primary-key columns",
            });
        }
        for (property, _) in &columns {
            if property.kind.is_join() {
                return Err(CodecError::Unsupported {
                    kind: "join",
                    reason: "join properties cannot be key columns",
                });
            }
        }

        Ok(Self { columns, prefix_padding: 0, suffix_padding: 0 })
    }

    /// Reserve fixed zero-filled padding around every encoded key.
    #[must_use]
    pub const fn with_padding(mut self, prefix: usize, suffix: usize) -> Self {
        self.prefix_padding = prefix;
        self.suffix_padding = suffix;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[(&'static PropertyModel, Direction)] {
        &self.columns
    }

    /// Encode one key tuple. Values adapt to the declared column kinds
    /// (fixed widening table) before encoding.
    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>, CodecError> {
        if values.len() != self.columns.len() {
            return Err(CodecError::ColumnCount {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        let mut out = Vec::new();
        out.resize(self.prefix_padding, 0);

        for ((property, direction), value) in self.columns.iter().zip(values) {
            encode_column(&mut out, property, *direction, value)?;
        }

        out.resize(out.len() + self.suffix_padding, 0);
        Ok(out)
    }

    /// Decode one key tuple, in declared column order.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, CodecError> {
        let mut reader = ByteReader::new(bytes);
        reader.skip(self.prefix_padding)?;

        let mut out = Vec::with_capacity(self.columns.len());
        for (property, direction) in &self.columns {
            out.push(decode_column(&mut reader, property, *direction)?);
        }

        reader.skip(self.suffix_padding)?;
        if !reader.is_empty() {
            return Err(CodecError::corrupt(format!(
                "{} trailing bytes after key columns",
                reader.remaining()
            )));
        }
        Ok(out)
    }
}

fn encode_column(
    out: &mut Vec<u8>,
    property: &'static PropertyModel,
    direction: Direction,
    value: &Value,
) -> Result<(), CodecError> {
    let desc = direction.is_descending();

    if value.is_null() && !property.nullable {
        return Err(CodecError::NullColumn { column: property.name });
    }

    let value = value.clone().adapt_to(property).map_err(|_| CodecError::ColumnMismatch {
        column: property.name,
        expected: property.kind.label(),
        found: value.label(),
    })?;

    if value.is_null() {
        // Bool needs no marker byte; its domain shares the marker slot.
        primitive::push_directed(out, &[NULL_HIGH], desc);
        return Ok(());
    }

    // Marker byte for fixed-width columns whose payload can collide with
    // the null marker.
    if property.nullable && needs_null_marker(property.kind) {
        primitive::push_directed(out, &[NOT_NULL], desc);
    }

    match value {
        Value::Bool(v) => primitive::push_directed(out, &[primitive::bool_byte(v)], desc),
        Value::I8(v) => primitive::push_directed(out, &primitive::ordered_i8_bytes(v), desc),
        Value::I16(v) => primitive::push_directed(out, &primitive::ordered_i16_bytes(v), desc),
        Value::I32(v) => primitive::push_directed(out, &primitive::ordered_i32_bytes(v), desc),
        Value::I64(v) => primitive::push_directed(out, &primitive::ordered_i64_bytes(v), desc),
        Value::U8(v) => primitive::push_directed(out, &[v], desc),
        Value::U16(v) => primitive::push_directed(out, &v.to_be_bytes(), desc),
        Value::U32(v) => primitive::push_directed(out, &v.to_be_bytes(), desc),
        Value::U64(v) => primitive::push_directed(out, &v.to_be_bytes(), desc),
        Value::F32(v) => primitive::push_directed(out, &primitive::ordered_f32_bytes(v), desc),
        Value::F64(v) => primitive::push_directed(out, &primitive::ordered_f64_bytes(v), desc),
        Value::Char(v) => primitive::push_directed(out, &primitive::char_bytes(v)?, desc),
        Value::Text(v) => {
            let mut encoded = Vec::with_capacity(v.len() + 1);
            text::encode_text(&mut encoded, &v);
            primitive::push_directed(out, &encoded, desc);
        }
        Value::Blob(v) => {
            let mut encoded = Vec::with_capacity(v.len() * 2 + 1);
            text::encode_blob(&mut encoded, &v);
            primitive::push_directed(out, &encoded, desc);
        }
        Value::Lob(v) => primitive::push_directed(out, &v.0.to_be_bytes(), desc),
        Value::Null => unreachable!("null handled above"),
    }

    Ok(())
}

fn decode_column(
    reader: &mut ByteReader<'_>,
    property: &'static PropertyModel,
    direction: Direction,
) -> Result<Value, CodecError> {
    let desc = direction.is_descending();

    if property.nullable {
        if reader.peek(desc)? == NULL_HIGH {
            reader.byte(desc)?;
            return Ok(Value::Null);
        }
        if needs_null_marker(property.kind) {
            let marker = reader.byte(desc)?;
            if marker != NOT_NULL {
                return Err(CodecError::corrupt(format!(
                    "invalid null marker {marker:#04x} in column '{}'",
                    property.name
                )));
            }
        }
    }

    let value = match property.kind {
        PropertyKind::Bool => Value::Bool(primitive::decode_bool(reader, desc)?),
        PropertyKind::I8 => Value::I8(primitive::decode_i8(reader, desc)?),
        PropertyKind::I16 => Value::I16(primitive::decode_i16(reader, desc)?),
        PropertyKind::I32 => Value::I32(primitive::decode_i32(reader, desc)?),
        PropertyKind::I64 => Value::I64(primitive::decode_i64(reader, desc)?),
        PropertyKind::U8 => Value::U8(primitive::decode_u8(reader, desc)?),
        PropertyKind::U16 => Value::U16(primitive::decode_u16(reader, desc)?),
        PropertyKind::U32 => Value::U32(primitive::decode_u32(reader, desc)?),
        PropertyKind::U64 => Value::U64(primitive::decode_u64(reader, desc)?),
        PropertyKind::F32 => Value::F32(primitive::decode_f32(reader, desc)?),
        PropertyKind::F64 => Value::F64(primitive::decode_f64(reader, desc)?),
        PropertyKind::Char => Value::Char(primitive::decode_char(reader, desc)?),
        PropertyKind::Text => Value::Text(text::decode_text(reader, desc)?),
        PropertyKind::Blob => Value::Blob(text::decode_blob(reader, desc)?),
        PropertyKind::Lob => Value::Lob(LobId(primitive::decode_u64(reader, desc)?)),
        PropertyKind::Join { .. } => {
            return Err(CodecError::Unsupported {
                kind: "join",
                reason: "join properties cannot be key columns",
            });
        }
    };

    Ok(value)
}

// Text and blob lead bytes are structurally below the null marker, so only
// fixed-width payloads pay for one.
const fn needs_null_marker(kind: PropertyKind) -> bool {
    !matches!(kind, PropertyKind::Bool | PropertyKind::Text | PropertyKind::Blob)
}
