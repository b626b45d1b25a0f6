//! HDLC frame structure and decoding
//!
//! ```text
//! flag | format(2) | dest addr(1,2,4) | src addr(1,2,4) | control | [HCS(2) | information] | FCS(2) | flag
//! ```
//!
//! The length in the format field counts every byte between the flags.

use crate::hdlc::address::HdlcAddress;
use crate::hdlc::fcs::fcs16;
use dlms_core::{DlmsError, DlmsResult};
use std::fmt;
use std::ops::Range;

/// HDLC frame flag
pub const FLAG: u8 = 0x7E;

/// Frame format type nibble of DLMS frames (type 3)
pub const FRAME_FORMAT_TYPE_3: u8 = 0x0A;

/// HDLC frame format field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat(u16);

impl FrameFormat {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    /// Frame format type (upper 4 bits)
    pub fn format_type(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Segmentation bit: more segments of this information field follow
    pub fn is_segmented(&self) -> bool {
        (self.0 >> 11) & 1 == 1
    }

    /// Frame length excluding the opening and closing flags
    pub fn length(&self) -> usize {
        usize::from(self.0 & 0x07FF)
    }
}

/// HDLC frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Information,
    ReceiveReady,
    ReceiveNotReady,
    SetNormalResponseMode,
    Disconnect,
    UnnumberedAcknowledge,
    DisconnectMode,
    FrameReject,
    UnnumberedInformation,
    Unknown,
}

impl FrameType {
    /// Get frame type from control byte
    pub fn from_control_byte(control_byte: u8) -> Self {
        match control_byte {
            x if (x & 0x01) == 0x00 => FrameType::Information,
            x if (x & 0x0F) == 0x01 => FrameType::ReceiveReady,
            x if (x & 0x0F) == 0x05 => FrameType::ReceiveNotReady,
            x if (x & 0xEF) == 0x83 => FrameType::SetNormalResponseMode,
            x if (x & 0xEF) == 0x43 => FrameType::Disconnect,
            x if (x & 0xEF) == 0x63 => FrameType::UnnumberedAcknowledge,
            x if (x & 0xEF) == 0x0F => FrameType::DisconnectMode,
            x if (x & 0xEF) == 0x87 => FrameType::FrameReject,
            x if (x & 0xEF) == 0x03 => FrameType::UnnumberedInformation,
            _ => FrameType::Unknown,
        }
    }

    /// Short name used in frame summaries
    pub fn abbreviation(&self) -> &'static str {
        match self {
            FrameType::Information => "I",
            FrameType::ReceiveReady => "RR",
            FrameType::ReceiveNotReady => "RNR",
            FrameType::SetNormalResponseMode => "SNRM",
            FrameType::Disconnect => "DISC",
            FrameType::UnnumberedAcknowledge => "UA",
            FrameType::DisconnectMode => "DM",
            FrameType::FrameReject => "FRMR",
            FrameType::UnnumberedInformation => "UI",
            FrameType::Unknown => "unknown",
        }
    }

    /// Frame name with its expansion, e.g. `RR (Receive Ready)`
    pub fn description(&self) -> &'static str {
        match self {
            FrameType::Information => "I (Information)",
            FrameType::ReceiveReady => "RR (Receive Ready)",
            FrameType::ReceiveNotReady => "RNR (Receive Not Ready)",
            FrameType::SetNormalResponseMode => "SNRM (Set Normal Response Mode)",
            FrameType::Disconnect => "DISC (Disconnect)",
            FrameType::UnnumberedAcknowledge => "UA (Unnumbered Acknowledge)",
            FrameType::DisconnectMode => "DM (Disconnected Mode)",
            FrameType::FrameReject => "FRMR (Frame Reject)",
            FrameType::UnnumberedInformation => "UI (Unnumbered Information)",
            FrameType::Unknown => "Unknown",
        }
    }

    /// Frame types reporting that the peer could not proceed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FrameType::ReceiveNotReady | FrameType::DisconnectMode | FrameType::FrameReject
        )
    }

    /// SNRM and UA frames may carry link parameters in their information field
    pub fn carries_parameters(&self) -> bool {
        matches!(
            self,
            FrameType::SetNormalResponseMode | FrameType::UnnumberedAcknowledge
        )
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// HDLC control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control(u8);

impl Control {
    pub fn new(byte: u8) -> Self {
        Self(byte)
    }

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from_control_byte(self.0)
    }

    /// Control byte with P/F and the sequence numbers masked off
    pub fn frame_bits(&self) -> u8 {
        match self.frame_type() {
            FrameType::Information => self.0 & 0x01,
            FrameType::ReceiveReady | FrameType::ReceiveNotReady => self.0 & 0x0F,
            _ => self.0 & 0xEF,
        }
    }

    /// Poll/final bit
    pub fn poll_final(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// N(S), only for I frames
    pub fn send_sequence(&self) -> Option<u8> {
        match self.frame_type() {
            FrameType::Information => Some((self.0 >> 1) & 0x07),
            _ => None,
        }
    }

    /// N(R), for I, RR and RNR frames
    pub fn receive_sequence(&self) -> Option<u8> {
        match self.frame_type() {
            FrameType::Information | FrameType::ReceiveReady | FrameType::ReceiveNotReady => {
                Some((self.0 >> 5) & 0x07)
            }
            _ => None,
        }
    }
}

/// A received check sequence and the value computed over the covered bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSequence {
    /// Offset of the two check sequence bytes
    pub offset: usize,
    pub received: u16,
    pub computed: u16,
}

impl CheckSequence {
    /// Compute over `buffer[covered]`; the check sequence follows it
    fn verify(buffer: &[u8], covered: Range<usize>) -> Self {
        let offset = covered.end;
        let received = u16::from_le_bytes([buffer[offset], buffer[offset + 1]]);
        Self {
            offset,
            received,
            computed: fcs16(&buffer[covered]),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.received == self.computed
    }

    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + 2
    }
}

/// A decoded HDLC frame
///
/// All offsets are positions in the buffer given to [`HdlcFrame::decode`],
/// whose first byte is the opening flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlcFrame {
    format: FrameFormat,
    destination: HdlcAddress,
    source: HdlcAddress,
    control: Control,
    control_offset: usize,
    hcs: Option<CheckSequence>,
    information: Range<usize>,
    fcs: CheckSequence,
}

impl HdlcFrame {
    /// Offset of the frame format field
    pub const FORMAT_OFFSET: usize = 1;
    /// Offset of the destination address
    pub const DESTINATION_OFFSET: usize = 3;

    /// Decode the frame at the start of `buffer`
    ///
    /// Check sequences are computed and kept, never enforced; a mismatch is
    /// for the caller to report.
    ///
    /// # Errors
    ///
    /// `FrameInvalid` when the opening flag is missing or the length is too
    /// small for the header, `Truncated` when the buffer is shorter than
    /// the length field announces.
    pub fn decode(buffer: &[u8]) -> DlmsResult<Self> {
        match buffer.first() {
            Some(&FLAG) => {}
            Some(other) => {
                return Err(DlmsError::FrameInvalid(format!(
                    "HDLC frame starts with 0x{:02X} instead of the flag",
                    other
                )));
            }
            None => return Err(DlmsError::truncated(0, 1, 0)),
        }
        if buffer.len() < 3 {
            return Err(DlmsError::truncated(1, 2, buffer.len()));
        }
        let format = FrameFormat::new(u16::from_be_bytes([buffer[1], buffer[2]]));
        let frame_end = 1 + format.length();

        let destination = HdlcAddress::read(buffer, Self::DESTINATION_OFFSET)?;
        let source_offset = Self::DESTINATION_OFFSET + destination.byte_length();
        let source = HdlcAddress::read(buffer, source_offset)?;
        let control_offset = source_offset + source.byte_length();
        let control = Control::new(
            *buffer
                .get(control_offset)
                .ok_or_else(|| DlmsError::truncated(control_offset, 1, buffer.len()))?,
        );
        let header_end = control_offset + 1;

        // format through control, plus the FCS
        let minimum = header_end - 1 + 2;
        if format.length() < minimum {
            return Err(DlmsError::FrameInvalid(format!(
                "HDLC length {} is shorter than its {}-byte header",
                format.length(),
                minimum
            )));
        }
        if buffer.len() < frame_end {
            return Err(DlmsError::truncated(1, format.length(), buffer.len() - 1));
        }

        let (hcs, information) = if format.length() > minimum {
            if format.length() < minimum + 2 {
                return Err(DlmsError::FrameInvalid(format!(
                    "HDLC length {} leaves no room for the HCS",
                    format.length()
                )));
            }
            let hcs = CheckSequence::verify(buffer, Self::FORMAT_OFFSET..header_end);
            (Some(hcs), header_end + 2..frame_end - 2)
        } else {
            (None, frame_end - 2..frame_end - 2)
        };
        let fcs = CheckSequence::verify(buffer, Self::FORMAT_OFFSET..frame_end - 2);

        log::trace!(
            "HDLC {} frame, length {}, information {:?}",
            control.frame_type(),
            format.length(),
            information
        );

        Ok(Self {
            format,
            destination,
            source,
            control,
            control_offset,
            hcs,
            information,
            fcs,
        })
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn destination(&self) -> &HdlcAddress {
        &self.destination
    }

    pub fn source_offset(&self) -> usize {
        Self::DESTINATION_OFFSET + self.destination.byte_length()
    }

    pub fn source(&self) -> &HdlcAddress {
        &self.source
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn control_offset(&self) -> usize {
        self.control_offset
    }

    /// Get frame type
    pub fn frame_type(&self) -> FrameType {
        self.control.frame_type()
    }

    /// Header check sequence, present when the frame has an information field
    pub fn hcs(&self) -> Option<&CheckSequence> {
        self.hcs.as_ref()
    }

    pub fn fcs(&self) -> &CheckSequence {
        &self.fcs
    }

    /// Span of the information field, possibly empty
    pub fn information(&self) -> Range<usize> {
        self.information.clone()
    }

    /// Offset of the closing flag
    pub fn closing_flag_offset(&self) -> usize {
        1 + self.format.length()
    }
}
