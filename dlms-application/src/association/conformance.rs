//! xDLMS conformance block
//!
//! The conformance block is a 24-bit BIT STRING negotiated by the
//! InitiateRequest (proposed) and InitiateResponse (negotiated). On the wire
//! it is carried as the BER-encoded `[APPLICATION 31]` element
//! `5F 1F 04 00 b1 b2 b3`: tag, length, unused bits, then three bytes.

use bitflags::bitflags;
use dlms_core::Field;

bitflags! {
    /// Conformance bits, with bit 0 of the BIT STRING as the most significant
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Conformance: u32 {
        const GENERAL_PROTECTION = 0x40_0000;
        const GENERAL_BLOCK_TRANSFER = 0x20_0000;
        const READ = 0x10_0000;
        const WRITE = 0x08_0000;
        const UNCONFIRMED_WRITE = 0x04_0000;
        const ATTRIBUTE0_SUPPORTED_WITH_SET = 0x00_8000;
        const PRIORITY_MGMT_SUPPORTED = 0x00_4000;
        const ATTRIBUTE0_SUPPORTED_WITH_GET = 0x00_2000;
        const BLOCK_TRANSFER_WITH_GET_OR_READ = 0x00_1000;
        const BLOCK_TRANSFER_WITH_SET_OR_WRITE = 0x00_0800;
        const BLOCK_TRANSFER_WITH_ACTION = 0x00_0400;
        const MULTIPLE_REFERENCES = 0x00_0200;
        const INFORMATION_REPORT = 0x00_0100;
        const DATA_NOTIFICATION = 0x00_0080;
        const ACCESS = 0x00_0040;
        const PARAMETERIZED_ACCESS = 0x00_0020;
        const GET = 0x00_0010;
        const SET = 0x00_0008;
        const SELECTIVE_ACCESS = 0x00_0004;
        const EVENT_NOTIFICATION = 0x00_0002;
        const ACTION = 0x00_0001;
    }
}

/// Wire names in bit order
pub const NAMED_FLAGS: [(&str, Conformance); 21] = [
    ("general-protection", Conformance::GENERAL_PROTECTION),
    ("general-block-transfer", Conformance::GENERAL_BLOCK_TRANSFER),
    ("read", Conformance::READ),
    ("write", Conformance::WRITE),
    ("unconfirmed-write", Conformance::UNCONFIRMED_WRITE),
    ("attribute0-supported-with-set", Conformance::ATTRIBUTE0_SUPPORTED_WITH_SET),
    ("priority-mgmt-supported", Conformance::PRIORITY_MGMT_SUPPORTED),
    ("attribute0-supported-with-get", Conformance::ATTRIBUTE0_SUPPORTED_WITH_GET),
    ("block-transfer-with-get-or-read", Conformance::BLOCK_TRANSFER_WITH_GET_OR_READ),
    ("block-transfer-with-set-or-write", Conformance::BLOCK_TRANSFER_WITH_SET_OR_WRITE),
    ("block-transfer-with-action", Conformance::BLOCK_TRANSFER_WITH_ACTION),
    ("multiple-references", Conformance::MULTIPLE_REFERENCES),
    ("information-report", Conformance::INFORMATION_REPORT),
    ("data-notification", Conformance::DATA_NOTIFICATION),
    ("access", Conformance::ACCESS),
    ("parameterized-access", Conformance::PARAMETERIZED_ACCESS),
    ("get", Conformance::GET),
    ("set", Conformance::SET),
    ("selective-access", Conformance::SELECTIVE_ACCESS),
    ("event-notification", Conformance::EVENT_NOTIFICATION),
    ("action", Conformance::ACTION),
];

/// Length of the encoded element, tag through the last bit byte
pub const ENCODED_LENGTH: usize = 7;

impl Conformance {
    /// Bits of a 3-byte big-endian bit field; undefined bits are dropped
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::from_bits_truncate(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Names of the set flags, in bit order
    pub fn names(self) -> Vec<&'static str> {
        NAMED_FLAGS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Decode the 7-byte element starting at `offset` of `buffer`
    ///
    /// Returns `None` when the element does not fit in the buffer. Every
    /// named flag gets a boolean child spanning the three bit bytes.
    pub fn decode_field(buffer: &[u8], offset: usize) -> Option<(Self, Field)> {
        let element = buffer.get(offset..offset.checked_add(ENCODED_LENGTH)?)?;
        let raw = [element[4], element[5], element[6]];
        let conformance = Self::from_bytes(raw);
        let bits = offset + 4..offset + ENCODED_LENGTH;

        let children = NAMED_FLAGS
            .iter()
            .map(|(name, flag)| Field::new(*name, bits.clone()).with_value(conformance.contains(*flag)))
            .collect();
        let field = Field::new("Conformance", offset..offset + ENCODED_LENGTH)
            .with_value(u32::from_be_bytes([0, raw[0], raw[1], raw[2]]))
            .with_children(children);
        Some((conformance, field))
    }
}
