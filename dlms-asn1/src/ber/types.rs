//! BER tag types

use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// BER Tag Class
///
/// ASN.1 defines four tag classes:
/// - **Universal**: Standard ASN.1 types (INTEGER, OCTET STRING, etc.)
/// - **Application**: Application-specific types (AARQ is `[APPLICATION 0]`)
/// - **Context-specific**: Context-dependent types (ACSE fields)
/// - **Private**: Private/implementation-specific types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerTagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl BerTagClass {
    /// Get tag class from bits 7-6 of a tag byte
    pub fn from_bits(byte: u8) -> Self {
        match (byte >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        }
    }
}

/// BER Tag
///
/// # Encoding Format
///
/// Short form (tag number 0-30):
/// ```text
/// Bits: 8 7 6 5 4 3 2 1
///       C C P T T T T T
/// ```
///
/// Extended form (tag number > 30): the first byte has all tag bits set
/// and base-128 continuation bytes follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    class: BerTagClass,
    constructed: bool,
    number: u32,
}

impl BerTag {
    pub fn new(class: BerTagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Get tag class
    pub fn class(&self) -> BerTagClass {
        self.class
    }

    /// Check if tag is constructed
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Get tag number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Decode the tag starting at `offset`
    ///
    /// # Returns
    /// The tag and the number of bytes it occupies
    pub fn decode_at(buffer: &[u8], offset: usize) -> DlmsResult<(Self, usize)> {
        let first_byte = *buffer
            .get(offset)
            .ok_or_else(|| DlmsError::truncated(offset, 1, buffer.len()))?;
        let class = BerTagClass::from_bits(first_byte);
        let constructed = (first_byte & 0x20) != 0;
        let tag_bits = first_byte & 0x1F;

        if tag_bits < 31 {
            return Ok((Self::new(class, constructed, u32::from(tag_bits)), 1));
        }

        let mut number = 0u32;
        let mut pos = offset + 1;
        loop {
            let byte = *buffer
                .get(pos)
                .ok_or_else(|| DlmsError::truncated(pos, 1, buffer.len()))?;
            number = number
                .checked_mul(128)
                .map(|n| n | u32::from(byte & 0x7F))
                .ok_or_else(|| DlmsError::InvalidData(format!("BER tag number overflow at offset {}", offset)))?;
            pos += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok((Self::new(class, constructed, number), pos - offset))
    }
}

impl fmt::Display for BerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            BerTagClass::Universal => "UNIVERSAL",
            BerTagClass::Application => "APPLICATION",
            BerTagClass::ContextSpecific => "CONTEXT",
            BerTagClass::Private => "PRIVATE",
        };
        write!(f, "[{} {}]", class, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_short_tags() {
        // AARQ
        let (tag, len) = BerTag::decode_at(&[0x60], 0).unwrap();
        assert_eq!(tag, BerTag::new(BerTagClass::Application, true, 0));
        assert_eq!(len, 1);
        // user-information
        let (tag, _) = BerTag::decode_at(&[0x00, 0xBE], 1).unwrap();
        assert_eq!(tag, BerTag::new(BerTagClass::ContextSpecific, true, 30));
        assert_eq!(tag.to_string(), "[CONTEXT 30]");
    }

    #[test]
    fn test_decode_extended_tag() {
        let (tag, len) = BerTag::decode_at(&[0x9F, 0x81, 0x00], 0).unwrap();
        assert_eq!(tag.number(), 128);
        assert_eq!(len, 3);
        assert!(BerTag::decode_at(&[0x9F, 0x81], 0).is_err());
    }
}
