//! HDLC address types

use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// Reserved HDLC addresses
pub mod reserved {
    /// Client management process
    pub const CLIENT_MANAGEMENT_PROCESS: u16 = 0x01;

    /// Client public client
    pub const CLIENT_PUBLIC_CLIENT: u16 = 0x10;

    /// All-station (broadcast), one-byte form
    pub const ALL_STATION_1BYTE: u16 = 0x7F;

    /// All-station (broadcast), two-byte form
    pub const ALL_STATION_2BYTE: u16 = 0x3FFF;
}

/// HDLC address
///
/// An address field is 1, 2 or 4 bytes. Every byte carries 7 address bits
/// in its upper bits; the least significant bit is set only on the last
/// byte. With 2 or 4 bytes the first half is the upper HDLC address
/// (logical device) and the second half the lower HDLC address (physical
/// device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HdlcAddress {
    byte_length: usize,
    upper: u16,
    lower: Option<u16>,
}

impl HdlcAddress {
    /// Read the address starting at `offset`
    ///
    /// # Errors
    ///
    /// `Truncated` if the buffer ends before a byte with the extension bit
    /// set, `FrameInvalid` for a 3-byte or longer-than-4-byte address.
    pub fn read(buffer: &[u8], offset: usize) -> DlmsResult<Self> {
        let mut length = 0;
        loop {
            let pos = offset + length;
            let byte = *buffer
                .get(pos)
                .ok_or_else(|| DlmsError::truncated(pos, 1, buffer.len()))?;
            length += 1;
            if byte & 0x01 != 0 {
                break;
            }
            if length == 4 {
                return Err(DlmsError::FrameInvalid(format!(
                    "HDLC address at offset {} is longer than 4 bytes",
                    offset
                )));
            }
        }

        let bits = |i: usize| u16::from(buffer[offset + i] >> 1);
        let (upper, lower) = match length {
            1 => (bits(0), None),
            2 => (bits(0), Some(bits(1))),
            4 => ((bits(0) << 7) | bits(1), Some((bits(2) << 7) | bits(3))),
            _ => {
                return Err(DlmsError::FrameInvalid(format!(
                    "HDLC address at offset {} has an invalid byte length of {}",
                    offset, length
                )));
            }
        };

        Ok(Self {
            byte_length: length,
            upper,
            lower,
        })
    }

    /// Upper HDLC address (logical device or client SAP)
    pub fn upper(&self) -> u16 {
        self.upper
    }

    /// Lower HDLC address (physical device), absent for 1-byte addresses
    pub fn lower(&self) -> Option<u16> {
        self.lower
    }

    /// Get byte length
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Check if this is an all-station (broadcast) address
    pub fn is_all_station(&self) -> bool {
        match self.byte_length {
            4 => self.upper == reserved::ALL_STATION_2BYTE,
            _ => self.upper == reserved::ALL_STATION_1BYTE,
        }
    }
}

impl fmt::Display for HdlcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Some(lower) => write!(f, "{}/{}", self.upper, lower),
            None => write!(f, "{}", self.upper),
        }
    }
}
