//! Compact array type descriptions
//!
//! ```text
//! type-description ::= array-tag(1) count(u16) type-description
//!                    | structure-tag(2) length(BER) type-description*
//!                    | simple-type-tag
//! ```

use crate::axdr::decoder::{AxdrDecoder, check_depth};
use crate::axdr::types::LengthEncoding;
use dlms_core::datatypes::{DataType, TypeDescription};
use dlms_core::{DlmsError, DlmsResult};

const ARRAY_TAG: u8 = DataType::Array as u8;
const STRUCTURE_TAG: u8 = DataType::Structure as u8;

/// Encoded size of the type description starting at `offset`
///
/// Walks the description without decoding it. Any tag other than array
/// or structure counts as a one-byte simple type, even if the tag is not
/// a known data type.
///
/// # Errors
///
/// Fails when the description runs past the end of `buffer` or nests
/// deeper than [`MAX_NESTING_DEPTH`](crate::axdr::MAX_NESTING_DEPTH).
pub fn type_description_length(buffer: &[u8], offset: usize) -> DlmsResult<usize> {
    description_end(buffer, offset, 0).map(|end| end - offset)
}

fn description_end(buffer: &[u8], offset: usize, depth: usize) -> DlmsResult<usize> {
    check_depth(depth, offset)?;
    let tag = *buffer
        .get(offset)
        .ok_or_else(|| DlmsError::truncated(offset, 1, buffer.len()))?;

    match tag {
        ARRAY_TAG => {
            if buffer.len() < offset + 3 {
                return Err(DlmsError::truncated(offset + 1, 2, buffer.len()));
            }
            description_end(buffer, offset + 3, depth + 1)
        }
        STRUCTURE_TAG => {
            let (count, consumed) = LengthEncoding::decode_at(buffer, offset + 1)?;
            let mut end = offset + 1 + consumed;
            for _ in 0..count.value() {
                end = description_end(buffer, end, depth + 1)?;
            }
            Ok(end)
        }
        _ => Ok(offset + 1),
    }
}

impl AxdrDecoder<'_> {
    /// Decode a type description
    ///
    /// # Errors
    ///
    /// Besides truncation, fails with `UnknownDataTag` for tags that are not
    /// data types and for a nested compact array.
    pub fn decode_type_description(&mut self) -> DlmsResult<TypeDescription> {
        self.decode_description_at_depth(0)
    }

    fn decode_description_at_depth(&mut self, depth: usize) -> DlmsResult<TypeDescription> {
        check_depth(depth, self.position())?;
        let start = self.position();
        let tag = self.decode_u8()?;

        match DataType::from_tag(tag) {
            Some(DataType::Array) => {
                let count = self.decode_u16()?;
                let element = self.decode_description_at_depth(depth + 1)?;
                Ok(TypeDescription::Array {
                    count,
                    element: Box::new(element),
                })
            }
            Some(DataType::Structure) => {
                let (count, _) = self.read_length()?;
                let mut members = Vec::new();
                for _ in 0..count {
                    members.push(self.decode_description_at_depth(depth + 1)?);
                }
                Ok(TypeDescription::Structure(members))
            }
            Some(DataType::CompactArray) | None => {
                Err(DlmsError::UnknownDataTag { tag, offset: start })
            }
            Some(simple) => Ok(TypeDescription::Planar(simple)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_of_simple_type() {
        assert_eq!(type_description_length(&[0x12], 0).unwrap(), 1);
        // unknown tags still count as one byte
        assert_eq!(type_description_length(&[0x00, 0xEE], 1).unwrap(), 1);
    }

    #[test]
    fn test_length_of_nested_description() {
        // structure { array[3] of unsigned, octet-string }
        let bytes = [0x02, 0x02, 0x01, 0x00, 0x03, 0x11, 0x09, 0xFF];
        assert_eq!(type_description_length(&bytes, 0).unwrap(), 7);
        // the same description starting inside a larger buffer
        let mut shifted = vec![0xAA, 0xBB];
        shifted.extend_from_slice(&bytes);
        assert_eq!(type_description_length(&shifted, 2).unwrap(), 7);
    }

    #[test]
    fn test_length_truncated() {
        assert!(type_description_length(&[0x01, 0x00], 0).is_err());
        assert!(type_description_length(&[0x02, 0x02, 0x11], 0).is_err());
    }

    #[test]
    fn test_decode_matches_length() {
        let bytes = [0x02, 0x02, 0x01, 0x00, 0x03, 0x11, 0x09];
        let mut decoder = AxdrDecoder::new(&bytes);
        let description = decoder.decode_type_description().unwrap();
        assert_eq!(decoder.position(), type_description_length(&bytes, 0).unwrap());
        assert_eq!(
            description,
            TypeDescription::Structure(vec![
                TypeDescription::Array {
                    count: 3,
                    element: Box::new(TypeDescription::Planar(DataType::Unsigned)),
                },
                TypeDescription::Planar(DataType::OctetString),
            ])
        );
    }

    #[test]
    fn test_decode_rejects_unknown_and_nested_compact() {
        let err = AxdrDecoder::new(&[0xEE]).decode_type_description().unwrap_err();
        assert_eq!(err, DlmsError::UnknownDataTag { tag: 0xEE, offset: 0 });
        assert!(AxdrDecoder::new(&[0x13]).decode_type_description().is_err());
    }
}
