//! BER element walker
//!
//! ACSE APDUs are BER encoded. The dissector does not need typed ACSE
//! structures, only the sequence of tag-length-value elements with their
//! positions, so [`BerDecoder`] yields [`BerElement`]s over a region of a
//! buffer and a few helpers interpret common primitive values.

use crate::axdr::types::LengthEncoding;
use crate::ber::types::BerTag;
use dlms_core::{DlmsError, DlmsResult};
use std::ops::Range;

/// One tag-length-value element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BerElement<'a> {
    pub tag: BerTag,
    /// Raw first tag byte, as ACSE field tables are usually written
    pub tag_byte: u8,
    /// Offset of the tag
    pub start: usize,
    /// Offset of the first value byte
    pub value_start: usize,
    pub value: &'a [u8],
}

impl BerElement<'_> {
    pub fn end(&self) -> usize {
        self.value_start + self.value.len()
    }

    /// Whole element including tag and length
    pub fn span(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn value_span(&self) -> Range<usize> {
        self.value_start..self.end()
    }
}

/// BER decoder over one region of a buffer
///
/// Offsets are absolute positions in the buffer handed to [`new`](Self::new),
/// so elements can be mapped back onto the captured frame.
#[derive(Debug, Clone)]
pub struct BerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BerDecoder<'a> {
    /// Walk `buffer[start..end]`
    pub fn new(buffer: &'a [u8], region: Range<usize>) -> Self {
        let end = region.end.min(buffer.len());
        Self {
            buffer: &buffer[..end],
            position: region.start.min(end),
        }
    }

    /// Get current position in buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check if there is more data to decode
    pub fn has_remaining(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Decode the next TLV element
    ///
    /// # Errors
    /// Truncation of the tag, length or value, or an indefinite length.
    pub fn next_element(&mut self) -> DlmsResult<BerElement<'a>> {
        let start = self.position;
        let tag_byte = *self
            .buffer
            .get(start)
            .ok_or_else(|| DlmsError::truncated(start, 1, self.buffer.len()))?;
        let (tag, tag_len) = BerTag::decode_at(self.buffer, start)?;
        let (length, length_len) = LengthEncoding::decode_at(self.buffer, start + tag_len)?;
        let value_start = start + tag_len + length_len;

        let value_len = usize::try_from(length.value()).map_err(|_| DlmsError::InvalidLength {
            offset: start + tag_len,
            reason: format!("length {} does not fit in memory", length.value()),
        })?;
        let value = value_start
            .checked_add(value_len)
            .and_then(|end| self.buffer.get(value_start..end))
            .ok_or_else(|| DlmsError::truncated(value_start, value_len, self.buffer.len()))?;

        self.position = value_start + value.len();
        Ok(BerElement {
            tag,
            tag_byte,
            start,
            value_start,
            value,
        })
    }
}

/// Two's complement big-endian INTEGER contents
pub fn decode_integer_value(bytes: &[u8]) -> DlmsResult<i64> {
    if bytes.is_empty() {
        return Err(DlmsError::InvalidData("Empty integer encoding".to_string()));
    }
    if bytes.len() > 8 {
        return Err(DlmsError::InvalidData(format!(
            "Integer too large: {} bytes (max 8)",
            bytes.len()
        )));
    }
    let mut value = if bytes[0] & 0x80 != 0 { -1i64 } else { 0 };
    for &byte in bytes {
        value = (value << 8) | i64::from(byte);
    }
    Ok(value)
}

/// OBJECT IDENTIFIER contents as arcs
pub fn decode_object_identifier(bytes: &[u8]) -> DlmsResult<Vec<u32>> {
    let (&first_byte, rest) = bytes
        .split_first()
        .ok_or_else(|| DlmsError::InvalidData("Empty object identifier encoding".to_string()))?;

    let mut oid = vec![u32::from(first_byte / 40), u32::from(first_byte % 40)];
    let mut component = 0u32;
    let mut pending = false;
    for &byte in rest {
        component = component
            .checked_mul(128)
            .map(|c| c | u32::from(byte & 0x7F))
            .ok_or_else(|| DlmsError::InvalidData("OID component overflow".to_string()))?;
        pending = byte & 0x80 != 0;
        if !pending {
            oid.push(component);
            component = 0;
        }
    }
    if pending {
        return Err(DlmsError::InvalidData("OID ends inside a component".to_string()));
    }
    Ok(oid)
}

/// Dotted notation of an OID, e.g. `2.16.756.5.8.1.1`
pub fn format_object_identifier(arcs: &[u32]) -> String {
    arcs.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_elements_with_absolute_offsets() {
        // junk, then A1 09 06 07 60 85 74 05 08 01 01, then 8A 02 07 80
        let bytes = [
            0xFF, 0xA1, 0x09, 0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01, 0x8A, 0x02,
            0x07, 0x80,
        ];
        let mut decoder = BerDecoder::new(&bytes, 1..bytes.len());

        let first = decoder.next_element().unwrap();
        assert_eq!(first.tag_byte, 0xA1);
        assert_eq!(first.span(), 1..12);
        assert_eq!(first.value_span(), 3..12);

        let mut inner = BerDecoder::new(&bytes, first.value_span());
        let oid = inner.next_element().unwrap();
        assert_eq!(oid.tag.number(), 6);
        assert_eq!(
            format_object_identifier(&decode_object_identifier(oid.value).unwrap()),
            "2.16.756.5.8.1.1"
        );

        let second = decoder.next_element().unwrap();
        assert_eq!(second.tag_byte, 0x8A);
        assert_eq!(second.value, &[0x07, 0x80]);
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn test_element_truncated() {
        let bytes = [0xBE, 0x05, 0x04];
        let mut decoder = BerDecoder::new(&bytes, 0..bytes.len());
        assert!(matches!(
            decoder.next_element(),
            Err(DlmsError::Truncated { offset: 2, .. })
        ));
    }

    #[test]
    fn test_integer_value() {
        assert_eq!(decode_integer_value(&[0x00]).unwrap(), 0);
        assert_eq!(decode_integer_value(&[0x01, 0x00]).unwrap(), 256);
        assert_eq!(decode_integer_value(&[0xFF]).unwrap(), -1);
        assert!(decode_integer_value(&[]).is_err());
    }
}
