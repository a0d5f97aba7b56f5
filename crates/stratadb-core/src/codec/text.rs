//! Self-delimiting string and blob encodings.
//!
//! Strings encode per UTF-16 code unit as one to three base-192 digits
//! stored at `0x02..=0xC1`, terminated by `0x01`; code points beyond the
//! BMP split into surrogate pairs first. Lexicographic byte order equals
//! code-unit order, and a prefix string sorts before its extensions.
//!
//! Blobs pack the input bit stream into 15-bit groups, each stored as two
//! base-192 digits at `0x20..=0xDF`. The terminator byte carries the used
//! bit count of the final group (`0x00..=0x0F`), so it both delimits the
//! stream and keeps prefix blobs sorting first. The empty blob is the
//! single terminator `0x00`.

use crate::codec::{ByteReader, CodecError};

const TEXT_TERMINATOR: u8 = 0x01;
const TEXT_DIGIT_OFFSET: u8 = 0x02;
const DIGIT_BASE: u32 = 192;

// Code-unit split points: one digit below 0x60, two below 0x1860, three up
// to 0xFFFF.
const ONE_DIGIT_MAX: u32 = 0x5F;
const TWO_DIGIT_BIAS: u32 = 0x60;
const THREE_DIGIT_BIAS: u32 = 0x1860;

const BLOB_DIGIT_OFFSET: u8 = 0x20;
const BLOB_DIGIT_MAX: u8 = 0xDF;
const GROUP_BITS: u32 = 15;
const GROUP_MASK: u32 = 0x7FFF;

pub(crate) fn encode_text(out: &mut Vec<u8>, text: &str) {
    for unit in text.encode_utf16() {
        encode_unit(out, u32::from(unit));
    }
    out.push(TEXT_TERMINATOR);
}

#[expect(clippy::cast_possible_truncation)]
fn encode_unit(out: &mut Vec<u8>, unit: u32) {
    if unit <= ONE_DIGIT_MAX {
        out.push(unit as u8 + TEXT_DIGIT_OFFSET);
    } else if unit < THREE_DIGIT_BIAS {
        let v = unit - TWO_DIGIT_BIAS;
        out.push((96 + v / DIGIT_BASE) as u8 + TEXT_DIGIT_OFFSET);
        out.push((v % DIGIT_BASE) as u8 + TEXT_DIGIT_OFFSET);
    } else {
        let v = unit - THREE_DIGIT_BIAS;
        out.push((128 + v / (DIGIT_BASE * DIGIT_BASE)) as u8 + TEXT_DIGIT_OFFSET);
        out.push((v / DIGIT_BASE % DIGIT_BASE) as u8 + TEXT_DIGIT_OFFSET);
        out.push((v % DIGIT_BASE) as u8 + TEXT_DIGIT_OFFSET);
    }
}

pub(crate) fn decode_text(reader: &mut ByteReader<'_>, desc: bool) -> Result<String, CodecError> {
    let mut units: Vec<u16> = Vec::new();

    loop {
        let byte = reader.byte(desc)?;
        if byte == TEXT_TERMINATOR {
            break;
        }
        let d0 = text_digit(byte)?;

        let unit = if d0 <= ONE_DIGIT_MAX {
            d0
        } else if d0 < 128 {
            let d1 = text_digit(reader.byte(desc)?)?;
            TWO_DIGIT_BIAS + (d0 - 96) * DIGIT_BASE + d1
        } else {
            let d1 = text_digit(reader.byte(desc)?)?;
            let d2 = text_digit(reader.byte(desc)?)?;
            THREE_DIGIT_BIAS + (d0 - 128) * DIGIT_BASE * DIGIT_BASE + d1 * DIGIT_BASE + d2
        };

        let unit = u16::try_from(unit)
            .map_err(|_| CodecError::corrupt(format!("code unit {unit:#x} out of range")))?;
        units.push(unit);
    }

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|err| CodecError::corrupt(format!("unpaired surrogate {:#06x}", err.unpaired_surrogate())))
}

fn text_digit(byte: u8) -> Result<u32, CodecError> {
    if (TEXT_DIGIT_OFFSET..TEXT_DIGIT_OFFSET + 192).contains(&byte) {
        Ok(u32::from(byte - TEXT_DIGIT_OFFSET))
    } else {
        Err(CodecError::corrupt(format!("invalid string digit {byte:#04x}")))
    }
}

#[expect(clippy::cast_possible_truncation)]
pub(crate) fn encode_blob(out: &mut Vec<u8>, bytes: &[u8]) {
    let mut acc: u32 = 0;
    let mut nbits: u32 = 0;

    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        nbits += 8;
        if nbits >= GROUP_BITS {
            push_group(out, (acc >> (nbits - GROUP_BITS)) & GROUP_MASK);
            nbits -= GROUP_BITS;
        }
    }

    if nbits > 0 {
        // Final partial group, zero-padded on the right.
        push_group(out, (acc & ((1 << nbits) - 1)) << (GROUP_BITS - nbits));
        out.push(nbits as u8);
    } else if bytes.is_empty() {
        out.push(0);
    } else {
        out.push(GROUP_BITS as u8);
    }
}

#[expect(clippy::cast_possible_truncation)]
fn push_group(out: &mut Vec<u8>, group: u32) {
    out.push((group / DIGIT_BASE) as u8 + BLOB_DIGIT_OFFSET);
    out.push((group % DIGIT_BASE) as u8 + BLOB_DIGIT_OFFSET);
}

#[expect(clippy::cast_possible_truncation)]
pub(crate) fn decode_blob(reader: &mut ByteReader<'_>, desc: bool) -> Result<Vec<u8>, CodecError> {
    let mut groups: Vec<u32> = Vec::new();

    let terminator = loop {
        let byte = reader.byte(desc)?;
        if byte < BLOB_DIGIT_OFFSET {
            break byte;
        }
        let d0 = blob_digit(byte)?;
        let d1 = blob_digit(reader.byte(desc)?)?;
        let group = d0 * DIGIT_BASE + d1;
        if group > GROUP_MASK {
            return Err(CodecError::corrupt(format!("blob group {group:#x} out of range")));
        }
        groups.push(group);
    };

    let used = u32::from(terminator);
    if used > GROUP_BITS {
        return Err(CodecError::corrupt(format!("invalid blob terminator {terminator:#04x}")));
    }

    if groups.is_empty() {
        return if used == 0 {
            Ok(Vec::new())
        } else {
            Err(CodecError::corrupt("blob terminator without digits"))
        };
    }
    if used == 0 {
        return Err(CodecError::corrupt("zero used bits in non-empty blob"));
    }

    let total_bits = GROUP_BITS as usize * (groups.len() - 1) + used as usize;
    if total_bits % 8 != 0 {
        return Err(CodecError::corrupt("blob bit count is not byte-aligned"));
    }

    let pad = GROUP_BITS - used;
    let last = *groups.last().expect("groups are non-empty");
    if pad > 0 && last & ((1 << pad) - 1) != 0 {
        return Err(CodecError::corrupt("non-zero padding in final blob group"));
    }

    let mut out = Vec::with_capacity(total_bits / 8);
    let mut acc: u32 = 0;
    let mut nbits: u32 = 0;
    let last_index = groups.len() - 1;

    for (index, group) in groups.into_iter().enumerate() {
        let (bits, count) = if index == last_index { (group >> pad, used) } else { (group, GROUP_BITS) };
        acc = (acc << count) | bits;
        nbits += count;
        while nbits >= 8 {
            out.push(((acc >> (nbits - 8)) & 0xFF) as u8);
            nbits -= 8;
        }
    }

    Ok(out)
}

fn blob_digit(byte: u8) -> Result<u32, CodecError> {
    if (BLOB_DIGIT_OFFSET..=BLOB_DIGIT_MAX).contains(&byte) {
        Ok(u32::from(byte - BLOB_DIGIT_OFFSET))
    } else {
        Err(CodecError::corrupt(format!("invalid blob digit {byte:#04x}")))
    }
}
