//! HDLC link parameter negotiation carried by SNRM and UA frames
//!
//! ```text
//! format id (0x81) | group id (0x80) | group length | { id | length | value (BE) }*
//! ```

use dlms_core::{DlmsError, DlmsResult};
use std::ops::Range;

/// Format identifier of the parameter negotiation field
pub const FORMAT_IDENTIFIER: u8 = 0x81;
/// Group identifier of the HDLC parameter group
pub const GROUP_IDENTIFIER: u8 = 0x80;

pub const MAX_INFO_FIELD_LENGTH_TRANSMIT: u8 = 5;
pub const MAX_INFO_FIELD_LENGTH_RECEIVE: u8 = 6;
pub const WINDOW_SIZE_TRANSMIT: u8 = 7;
pub const WINDOW_SIZE_RECEIVE: u8 = 8;

/// One negotiated parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParameter {
    pub id: u8,
    pub value: u64,
    /// Identifier, length and value bytes
    pub span: Range<usize>,
}

impl LinkParameter {
    pub fn name(&self) -> &'static str {
        match self.id {
            MAX_INFO_FIELD_LENGTH_TRANSMIT => "Maximum Information Field Length Transmit",
            MAX_INFO_FIELD_LENGTH_RECEIVE => "Maximum Information Field Length Receive",
            WINDOW_SIZE_TRANSMIT => "Window Size Transmit",
            WINDOW_SIZE_RECEIVE => "Window Size Receive",
            _ => "Unknown Information Field Parameter",
        }
    }
}

/// Decode the parameters in `buffer[region]`
///
/// Returns `Ok(None)` when the field does not start with the HDLC
/// parameter format and group identifiers.
///
/// # Errors
///
/// `Truncated` when a parameter runs past the region, `InvalidData` for a
/// value wider than 8 bytes.
pub fn decode_parameters(buffer: &[u8], region: Range<usize>) -> DlmsResult<Option<Vec<LinkParameter>>> {
    let buffer = &buffer[..region.end.min(buffer.len())];
    let byte_at = |pos: usize| {
        buffer
            .get(pos)
            .copied()
            .ok_or_else(|| DlmsError::truncated(pos, 1, buffer.len()))
    };

    let start = region.start;
    if byte_at(start)? != FORMAT_IDENTIFIER || byte_at(start + 1)? != GROUP_IDENTIFIER {
        return Ok(None);
    }
    let group_length = usize::from(byte_at(start + 2)?);
    let group_end = start + 3 + group_length;

    let mut parameters = Vec::new();
    let mut pos = start + 3;
    while pos < group_end {
        let id = byte_at(pos)?;
        let length = usize::from(byte_at(pos + 1)?);
        if length > 8 {
            return Err(DlmsError::InvalidData(format!(
                "HDLC parameter {} at offset {} has a {}-byte value",
                id, pos, length
            )));
        }
        let value_bytes = buffer
            .get(pos + 2..pos + 2 + length)
            .ok_or_else(|| DlmsError::truncated(pos + 2, length, buffer.len()))?;
        let value = value_bytes
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        parameters.push(LinkParameter {
            id,
            value,
            span: pos..pos + 2 + length,
        });
        pos += 2 + length;
    }
    Ok(Some(parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_snrm_parameters() {
        let bytes = [
            0x81, 0x80, 0x14, 0x05, 0x02, 0x00, 0x80, 0x06, 0x02, 0x00, 0x80, 0x07, 0x04, 0x00,
            0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0x07,
        ];
        let parameters = decode_parameters(&bytes, 0..bytes.len()).unwrap().unwrap();
        assert_eq!(parameters.len(), 4);
        assert_eq!(parameters[0].name(), "Maximum Information Field Length Transmit");
        assert_eq!(parameters[0].value, 128);
        assert_eq!(parameters[0].span, 3..7);
        assert_eq!(parameters[3].id, WINDOW_SIZE_RECEIVE);
        assert_eq!(parameters[3].value, 7);
        assert_eq!(parameters[3].span, 17..23);
    }

    #[test]
    fn test_other_format_is_ignored() {
        assert_eq!(decode_parameters(&[0x82, 0x80, 0x00], 0..3).unwrap(), None);
    }

    #[test]
    fn test_parameter_past_region() {
        let bytes = [0x81, 0x80, 0x04, 0x05, 0x02, 0x00, 0x80];
        assert!(matches!(
            decode_parameters(&bytes, 0..6),
            Err(DlmsError::Truncated { .. })
        ));
    }
}
