//! A-XDR length encoding

use dlms_core::{DlmsError, DlmsResult};

/// Definite-form BER length as used by A-XDR
///
/// # Encoding Format
///
/// ```text
/// 0xxxxxxx                  short form, length 0..=127
/// 1nnnnnnn  b1 .. bn        long form, n big-endian length bytes
/// ```
///
/// The indefinite form (`0x80` with no length bytes) never occurs in
/// DLMS and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthEncoding {
    /// Short form: length < 128, encoded in 1 byte
    Short(u8),
    /// Long form: length-of-length byte + length bytes
    Long(u64),
}

impl LengthEncoding {
    /// Longest supported long form
    pub const MAX_LENGTH_BYTES: usize = 8;

    /// The decoded magnitude
    pub fn value(&self) -> u64 {
        match *self {
            LengthEncoding::Short(len) => len.into(),
            LengthEncoding::Long(len) => len,
        }
    }

    /// Decode the length that starts at `offset` in `buffer`
    ///
    /// Pure function of its inputs; nothing is consumed.
    ///
    /// # Returns
    ///
    /// The length and the number of bytes its encoding occupies
    ///
    /// # Errors
    ///
    /// * `DlmsError::Truncated` - the length or its extension bytes run past the buffer
    /// * `DlmsError::InvalidLength` - indefinite form or more than 8 extension bytes
    pub fn decode_at(buffer: &[u8], offset: usize) -> DlmsResult<(Self, usize)> {
        let first_byte = *buffer
            .get(offset)
            .ok_or_else(|| DlmsError::truncated(offset, 1, buffer.len()))?;

        if (first_byte & 0x80) == 0 {
            return Ok((LengthEncoding::Short(first_byte), 1));
        }

        let length_of_length = usize::from(first_byte & 0x7F);
        if length_of_length == 0 {
            return Err(DlmsError::InvalidLength {
                offset,
                reason: "indefinite length form".to_string(),
            });
        }
        if length_of_length > Self::MAX_LENGTH_BYTES {
            return Err(DlmsError::InvalidLength {
                offset,
                reason: format!("length-of-length {} exceeds 8", length_of_length),
            });
        }
        let start = offset + 1;
        let bytes = buffer
            .get(start..start + length_of_length)
            .ok_or_else(|| DlmsError::truncated(start, length_of_length, buffer.len()))?;

        let len = bytes
            .iter()
            .fold(0u64, |len, &byte| (len << 8) | u64::from(byte));
        Ok((LengthEncoding::Long(len), 1 + length_of_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_short() {
        let (len, consumed) = LengthEncoding::decode_at(&[0x7F], 0).unwrap();
        assert_eq!(len, LengthEncoding::Short(127));
        assert_eq!(len.value(), 127);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_length_long() {
        let buffer = [0xAA, 0x82, 0x01, 0x00];
        let (len, consumed) = LengthEncoding::decode_at(&buffer, 1).unwrap();
        assert_eq!(len.value(), 256);
        assert_eq!(consumed, 3);

        let (len, _) = LengthEncoding::decode_at(&[0x81, 0x80], 0).unwrap();
        assert_eq!(len.value(), 128);
    }

    #[test]
    fn test_length_indefinite_rejected() {
        let err = LengthEncoding::decode_at(&[0x80, 0x00], 0).unwrap_err();
        assert!(matches!(err, DlmsError::InvalidLength { offset: 0, .. }));
    }

    #[test]
    fn test_length_truncated() {
        let err = LengthEncoding::decode_at(&[0x83, 0x01], 0).unwrap_err();
        assert_eq!(
            err,
            DlmsError::Truncated {
                offset: 1,
                needed: 3,
                available: 1
            }
        );
        assert!(LengthEncoding::decode_at(&[], 0).is_err());
    }
}
