//! Fixed-width order-preserving primitive encodings.
//!
//! Signed integers flip the sign bit so two's complement collates
//! numerically. Floats flip the sign bit, or every bit for negatives, which
//! puts NaN last and keeps negative zero adjacent to positive zero.

use crate::codec::{BOOL_FALSE, BOOL_TRUE, ByteReader, CodecError};
use crate::value::{ordered_f32_bits, ordered_f64_bits};

pub(crate) const fn ordered_i8_bytes(value: i8) -> [u8; 1] {
    [value.cast_unsigned() ^ 0x80]
}

pub(crate) const fn ordered_i16_bytes(value: i16) -> [u8; 2] {
    (value.cast_unsigned() ^ (1u16 << 15)).to_be_bytes()
}

pub(crate) const fn ordered_i32_bytes(value: i32) -> [u8; 4] {
    (value.cast_unsigned() ^ (1u32 << 31)).to_be_bytes()
}

pub(crate) const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    (value.cast_unsigned() ^ (1u64 << 63)).to_be_bytes()
}

pub(crate) const fn ordered_f32_bytes(value: f32) -> [u8; 4] {
    ordered_f32_bits(value).to_be_bytes()
}

pub(crate) const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    ordered_f64_bits(value).to_be_bytes()
}

pub(crate) fn decode_i8(reader: &mut ByteReader<'_>, desc: bool) -> Result<i8, CodecError> {
    let [byte] = reader.array::<1>(desc)?;
    Ok((byte ^ 0x80).cast_signed())
}

pub(crate) fn decode_i16(reader: &mut ByteReader<'_>, desc: bool) -> Result<i16, CodecError> {
    let bytes = reader.array::<2>(desc)?;
    Ok((u16::from_be_bytes(bytes) ^ (1u16 << 15)).cast_signed())
}

pub(crate) fn decode_i32(reader: &mut ByteReader<'_>, desc: bool) -> Result<i32, CodecError> {
    let bytes = reader.array::<4>(desc)?;
    Ok((u32::from_be_bytes(bytes) ^ (1u32 << 31)).cast_signed())
}

pub(crate) fn decode_i64(reader: &mut ByteReader<'_>, desc: bool) -> Result<i64, CodecError> {
    let bytes = reader.array::<8>(desc)?;
    Ok((u64::from_be_bytes(bytes) ^ (1u64 << 63)).cast_signed())
}

pub(crate) fn decode_u8(reader: &mut ByteReader<'_>, desc: bool) -> Result<u8, CodecError> {
    let [byte] = reader.array::<1>(desc)?;
    Ok(byte)
}

pub(crate) fn decode_u16(reader: &mut ByteReader<'_>, desc: bool) -> Result<u16, CodecError> {
    Ok(u16::from_be_bytes(reader.array::<2>(desc)?))
}

pub(crate) fn decode_u32(reader: &mut ByteReader<'_>, desc: bool) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(reader.array::<4>(desc)?))
}

pub(crate) fn decode_u64(reader: &mut ByteReader<'_>, desc: bool) -> Result<u64, CodecError> {
    Ok(u64::from_be_bytes(reader.array::<8>(desc)?))
}

pub(crate) fn decode_f32(reader: &mut ByteReader<'_>, desc: bool) -> Result<f32, CodecError> {
    let bits = u32::from_be_bytes(reader.array::<4>(desc)?);
    let raw = if bits & 0x8000_0000 == 0 { !bits } else { bits ^ 0x8000_0000 };
    Ok(f32::from_bits(raw))
}

pub(crate) fn decode_f64(reader: &mut ByteReader<'_>, desc: bool) -> Result<f64, CodecError> {
    let bits = u64::from_be_bytes(reader.array::<8>(desc)?);
    let raw = if bits & 0x8000_0000_0000_0000 == 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    };
    Ok(f64::from_bits(raw))
}

pub(crate) const fn bool_byte(value: bool) -> u8 {
    if value { BOOL_TRUE } else { BOOL_FALSE }
}

pub(crate) fn decode_bool(reader: &mut ByteReader<'_>, desc: bool) -> Result<bool, CodecError> {
    match reader.byte(desc)? {
        BOOL_FALSE => Ok(false),
        BOOL_TRUE => Ok(true),
        other => Err(CodecError::corrupt(format!("invalid bool byte {other:#04x}"))),
    }
}

/// Chars encode as one UTF-16 code unit. Supplementary characters would
/// widen the column and are rejected.
pub(crate) fn char_bytes(value: char) -> Result<[u8; 2], CodecError> {
    let scalar = value as u32;
    u16::try_from(scalar)
        .map(u16::to_be_bytes)
        .map_err(|_| CodecError::Unsupported {
            kind: "char",
            reason: "supplementary characters do not fit one UTF-16 code unit",
        })
}

pub(crate) fn decode_char(reader: &mut ByteReader<'_>, desc: bool) -> Result<char, CodecError> {
    let unit = u16::from_be_bytes(reader.array::<2>(desc)?);
    char::from_u32(u32::from(unit))
        .ok_or_else(|| CodecError::corrupt(format!("invalid char code unit {unit:#06x}")))
}

// Append `bytes`, complementing when the column is descending.
pub(crate) fn push_directed(out: &mut Vec<u8>, bytes: &[u8], desc: bool) {
    if desc {
        out.extend(bytes.iter().map(|byte| !byte));
    } else {
        out.extend_from_slice(bytes);
    }
}
