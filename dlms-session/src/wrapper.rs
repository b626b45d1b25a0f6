//! Wrapper header used for DLMS/COSEM over TCP and UDP

use dlms_core::{DlmsError, DlmsResult};

/// Wrapper header length
pub const WRAPPER_HEADER_LENGTH: usize = 8;

/// The only wrapper version defined
pub const WRAPPER_VERSION: u16 = 1;

/// Wrapper header
///
/// ```text
/// version(2) | source wPort(2) | destination wPort(2) | length(2)
/// ```
///
/// All fields are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperHeader {
    version: u16,
    source_port: u16,
    destination_port: u16,
    length: u16,
}

impl WrapperHeader {
    /// Decode header from bytes
    pub fn decode(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < WRAPPER_HEADER_LENGTH {
            return Err(DlmsError::truncated(0, WRAPPER_HEADER_LENGTH, data.len()));
        }
        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
        Ok(Self {
            version: word(0),
            source_port: word(2),
            destination_port: word(4),
            length: word(6),
        })
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn is_supported_version(&self) -> bool {
        self.version == WRAPPER_VERSION
    }

    /// Source wPort
    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    /// Destination wPort
    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    /// Get payload length
    pub fn payload_length(&self) -> u16 {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let header =
            WrapperHeader::decode(&[0x00, 0x01, 0x00, 0x10, 0x00, 0x01, 0x00, 0x05, 0xC0]).unwrap();
        assert!(header.is_supported_version());
        assert_eq!(header.source_port(), 0x10);
        assert_eq!(header.destination_port(), 1);
        assert_eq!(header.payload_length(), 5);
    }

    #[test]
    fn test_other_version_still_decodes() {
        let header = WrapperHeader::decode(&[0x00, 0x02, 0, 1, 0, 1, 0, 0]).unwrap();
        assert_eq!(header.version(), 2);
        assert!(!header.is_supported_version());
    }

    #[test]
    fn test_decode_short_header() {
        assert!(matches!(
            WrapperHeader::decode(&[0x00, 0x01, 0x00]),
            Err(DlmsError::Truncated { needed: 8, available: 3, .. })
        ));
    }
}
