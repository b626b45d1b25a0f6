//! LLC headers in front of DLMS APDUs

use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// Logical Link Control (LLC) Request
pub const LLC_REQUEST: [u8; 3] = [0xE6, 0xE6, 0x00];

/// Logical Link Control (LLC) Response
pub const LLC_RESPONSE: [u8; 3] = [0xE6, 0xE7, 0x00];

/// Destination LSAP of IEC 61334-4-32 data frames
pub const IEC_432_LSAP: u8 = 0x90;

/// Every LLC header variant is three bytes long
pub const LLC_HEADER_LENGTH: usize = 3;

/// Direction announced by an HDLC LLC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlcDirection {
    Request,
    Response,
    Unknown,
}

impl fmt::Display for LlcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LlcDirection::Request => "request",
            LlcDirection::Response => "response",
            LlcDirection::Unknown => "unknown",
        })
    }
}

/// A three-byte LLC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcHeader {
    bytes: [u8; 3],
}

impl LlcHeader {
    /// Read the header at `offset`
    pub fn read(buffer: &[u8], offset: usize) -> DlmsResult<Self> {
        let bytes = buffer
            .get(offset..offset + LLC_HEADER_LENGTH)
            .ok_or_else(|| DlmsError::truncated(offset, LLC_HEADER_LENGTH, buffer.len()))?;
        Ok(Self {
            bytes: [bytes[0], bytes[1], bytes[2]],
        })
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.bytes
    }

    /// Direction of an HDLC LLC header
    pub fn direction(&self) -> LlcDirection {
        match self.bytes {
            LLC_REQUEST => LlcDirection::Request,
            LLC_RESPONSE => LlcDirection::Response,
            _ => LlcDirection::Unknown,
        }
    }

    /// Destination LSAP
    pub fn destination_lsap(&self) -> u8 {
        self.bytes[0]
    }

    /// Source LSAP
    pub fn source_lsap(&self) -> u8 {
        self.bytes[1]
    }

    /// Quality byte
    pub fn quality(&self) -> u8 {
        self.bytes[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        let header = LlcHeader::read(&[0x00, 0xE6, 0xE7, 0x00, 0xC4], 1).unwrap();
        assert_eq!(header.direction(), LlcDirection::Response);
        assert_eq!(LlcHeader::read(&LLC_REQUEST, 0).unwrap().direction(), LlcDirection::Request);
        assert_eq!(
            LlcHeader::read(&[0x90, 0x90, 0x00], 0).unwrap().direction(),
            LlcDirection::Unknown
        );
    }

    #[test]
    fn test_lsaps() {
        let header = LlcHeader::read(&[0x90, 0x91, 0x00], 0).unwrap();
        assert_eq!(header.destination_lsap(), IEC_432_LSAP);
        assert_eq!(header.source_lsap(), 0x91);
        assert_eq!(header.quality(), 0);
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            LlcHeader::read(&[0xE6, 0xE6], 0),
            Err(DlmsError::Truncated { offset: 0, needed: 3, .. })
        ));
    }
}
