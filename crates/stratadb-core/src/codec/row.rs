//! Row (non-key) record codec.
//!
//! Layout: optional generation tag, packed null-flag bytes covering the
//! nullable columns, column payloads in declared order, optional suffix
//! padding. Row payloads reuse the ascending key primitives; ordering is
//! irrelevant here, bit-exactness is not.

use crate::{
    codec::{ByteReader, CodecError, primitive, text},
    model::{PropertyKind, PropertyModel, RecordModel},
    value::{LobId, Value},
};

// Four-byte generation form carries the high bit; one-byte form is 0..=127.
const GENERATION_WIDE_FLAG: u8 = 0x80;
const GENERATION_MAX: u32 = 0x7FFF_FFFF;

///
/// RowLayout
///
/// Encoding plan for one record's non-key properties.
///

pub struct RowLayout {
    columns: Vec<&'static PropertyModel>,
    generation: Option<u32>,
    suffix_padding: usize,
}

impl RowLayout {
    /// Non-key, non-join properties of the record, in declared order.
    #[must_use]
    pub fn for_record(record: &'static RecordModel) -> Self {
        Self { columns: record.data_properties(), generation: None, suffix_padding: 0 }
    }

    /// Tag every encoded row with a layout generation.
    #[must_use]
    pub const fn with_generation(mut self, generation: u32) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Reserve fixed zero-filled padding after every encoded row.
    #[must_use]
    pub const fn with_suffix_padding(mut self, padding: usize) -> Self {
        self.suffix_padding = padding;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[&'static PropertyModel] {
        &self.columns
    }

    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>, CodecError> {
        if values.len() != self.columns.len() {
            return Err(CodecError::ColumnCount {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        let mut out = Vec::new();
        if let Some(generation) = self.generation {
            encode_generation(&mut out, generation)?;
        }

        self.encode_null_map(&mut out, values)?;

        for (property, value) in self.columns.iter().zip(values) {
            let value = value.clone().adapt_to(property).map_err(|_| {
                CodecError::ColumnMismatch {
                    column: property.name,
                    expected: property.kind.label(),
                    found: value.label(),
                }
            })?;
            if value.is_null() {
                continue;
            }
            encode_payload(&mut out, property, &value)?;
        }

        out.resize(out.len() + self.suffix_padding, 0);
        Ok(out)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, CodecError> {
        let bytes = if let Some(expected) = self.generation {
            let (found, rest) = decode_generation(bytes)?;
            if found != expected {
                return Err(CodecError::GenerationMismatch { expected, found });
            }
            rest
        } else {
            bytes
        };

        let mut reader = ByteReader::new(bytes);
        let null_map = self.decode_null_map(&mut reader)?;

        let mut out = Vec::with_capacity(self.columns.len());
        let mut nullable_index = 0;
        for property in &self.columns {
            if property.nullable {
                let is_null = null_map[nullable_index];
                nullable_index += 1;
                if is_null {
                    out.push(Value::Null);
                    continue;
                }
            }
            out.push(decode_payload(&mut reader, property)?);
        }

        reader.skip(self.suffix_padding)?;
        if !reader.is_empty() {
            return Err(CodecError::corrupt(format!(
                "{} trailing bytes after row columns",
                reader.remaining()
            )));
        }
        Ok(out)
    }

    fn nullable_count(&self) -> usize {
        self.columns.iter().filter(|p| p.nullable).count()
    }

    fn encode_null_map(&self, out: &mut Vec<u8>, values: &[Value]) -> Result<(), CodecError> {
        let count = self.nullable_count();
        if count == 0 {
            return Ok(());
        }

        let start = out.len();
        out.resize(start + count.div_ceil(8), 0);

        let mut bit = 0;
        for (property, value) in self.columns.iter().zip(values) {
            if !property.nullable {
                if value.is_null() {
                    return Err(CodecError::NullColumn { column: property.name });
                }
                continue;
            }
            if value.is_null() {
                out[start + bit / 8] |= 0x80 >> (bit % 8);
            }
            bit += 1;
        }
        Ok(())
    }

    fn decode_null_map(&self, reader: &mut ByteReader<'_>) -> Result<Vec<bool>, CodecError> {
        let count = self.nullable_count();
        let mut flags = Vec::with_capacity(count);
        if count == 0 {
            return Ok(flags);
        }

        let mut bytes = Vec::with_capacity(count.div_ceil(8));
        for _ in 0..count.div_ceil(8) {
            bytes.push(reader.byte(false)?);
        }
        for bit in 0..count {
            flags.push(bytes[bit / 8] & (0x80 >> (bit % 8)) != 0);
        }
        Ok(flags)
    }
}

#[expect(clippy::cast_possible_truncation)]
fn encode_generation(out: &mut Vec<u8>, generation: u32) -> Result<(), CodecError> {
    if generation <= 127 {
        out.push(generation as u8);
        Ok(())
    } else if generation <= GENERATION_MAX {
        out.extend_from_slice(&(generation | 0x8000_0000).to_be_bytes());
        Ok(())
    } else {
        Err(CodecError::GenerationRange { generation })
    }
}

/// Split the leading generation tag off one encoded row.
pub fn decode_generation(bytes: &[u8]) -> Result<(u32, &[u8]), CodecError> {
    let first = *bytes.first().ok_or(CodecError::Truncated { expected: 1 })?;

    if first & GENERATION_WIDE_FLAG == 0 {
        return Ok((u32::from(first), &bytes[1..]));
    }
    if bytes.len() < 4 {
        return Err(CodecError::Truncated { expected: 4 - bytes.len() });
    }

    let mut wide = [0u8; 4];
    wide.copy_from_slice(&bytes[..4]);
    Ok((u32::from_be_bytes(wide) & GENERATION_MAX, &bytes[4..]))
}

fn encode_payload(
    out: &mut Vec<u8>,
    property: &'static PropertyModel,
    value: &Value,
) -> Result<(), CodecError> {
    match value {
        Value::Bool(v) => out.push(primitive::bool_byte(*v)),
        Value::I8(v) => out.extend_from_slice(&primitive::ordered_i8_bytes(*v)),
        Value::I16(v) => out.extend_from_slice(&primitive::ordered_i16_bytes(*v)),
        Value::I32(v) => out.extend_from_slice(&primitive::ordered_i32_bytes(*v)),
        Value::I64(v) => out.extend_from_slice(&primitive::ordered_i64_bytes(*v)),
        Value::U8(v) => out.push(*v),
        Value::U16(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::U64(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::F32(v) => out.extend_from_slice(&primitive::ordered_f32_bytes(*v)),
        Value::F64(v) => out.extend_from_slice(&primitive::ordered_f64_bytes(*v)),
        Value::Char(v) => out.extend_from_slice(&primitive::char_bytes(*v)?),
        Value::Text(v) => text::encode_text(out, v),
        Value::Blob(v) => text::encode_blob(out, v),
        Value::Lob(v) => out.extend_from_slice(&v.0.to_be_bytes()),
        Value::Null => {
            return Err(CodecError::NullColumn { column: property.name });
        }
    }
    Ok(())
}

fn decode_payload(
    reader: &mut ByteReader<'_>,
    property: &'static PropertyModel,
) -> Result<Value, CodecError> {
    let value = match property.kind {
        PropertyKind::Bool => Value::Bool(primitive::decode_bool(reader, false)?),
        PropertyKind::I8 => Value::I8(primitive::decode_i8(reader, false)?),
        PropertyKind::I16 => Value::I16(primitive::decode_i16(reader, false)?),
        PropertyKind::I32 => Value::I32(primitive::decode_i32(reader, false)?),
        PropertyKind::I64 => Value::I64(primitive::decode_i64(reader, false)?),
        PropertyKind::U8 => Value::U8(primitive::decode_u8(reader, false)?),
        PropertyKind::U16 => Value::U16(primitive::decode_u16(reader, false)?),
        PropertyKind::U32 => Value::U32(primitive::decode_u32(reader, false)?),
        PropertyKind::U64 => Value::U64(primitive::decode_u64(reader, false)?),
        PropertyKind::F32 => Value::F32(primitive::decode_f32(reader, false)?),
        PropertyKind::F64 => Value::F64(primitive::decode_f64(reader, false)?),
        PropertyKind::Char => Value::Char(primitive::decode_char(reader, false)?),
        PropertyKind::Text => Value::Text(text::decode_text(reader, false)?),
        PropertyKind::Blob => Value::Blob(text::decode_blob(reader, false)?),
        PropertyKind::Lob => Value::Lob(LobId(primitive::decode_u64(reader, false)?)),
        PropertyKind::Join { .. } => {
            return Err(CodecError::Unsupported {
                kind: "join",
                reason: "join properties are not stored inline",
            });
        }
    };
    Ok(value)
}
