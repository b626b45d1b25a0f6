use thiserror::Error;

/// Error type for DLMS/COSEM decoding
///
/// Only structural problems are errors. Protocol-level anomalies such as a
/// non-success result code or a bad check sequence are reported as
/// [`Annotation`](crate::tree::Annotation)s and decoding carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DlmsError {
    /// The buffer ended in the middle of a field
    #[error("Buffer exhausted at offset {offset}: need {needed} byte(s), {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unknown data type tag 0x{tag:02X} at offset {offset}")]
    UnknownDataTag { tag: u8, offset: usize },

    #[error("Invalid length at offset {offset}: {reason}")]
    InvalidLength { offset: usize, reason: String },

    /// The last compact array element does not end on the declared content boundary
    #[error("Compact array element starting at offset {element_start} runs past content end {content_end}")]
    CompactArrayOverrun {
        element_start: usize,
        content_end: usize,
    },

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Reassembly error: {0}")]
    Reassembly(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DlmsError {
    /// Build a [`DlmsError::Truncated`] for a read of `needed` bytes at `offset`
    /// from a buffer of `len` bytes
    pub fn truncated(offset: usize, needed: usize, len: usize) -> Self {
        DlmsError::Truncated {
            offset,
            needed,
            available: len.saturating_sub(offset),
        }
    }

    /// Whether this error means the byte stream itself could not be followed
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            DlmsError::Truncated { .. }
                | DlmsError::UnknownDataTag { .. }
                | DlmsError::InvalidLength { .. }
                | DlmsError::CompactArrayOverrun { .. }
                | DlmsError::FrameInvalid(_)
                | DlmsError::InvalidData(_)
        )
    }
}

/// Result type alias for DLMS decoding
pub type DlmsResult<T> = Result<T, DlmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_available_saturates() {
        let err = DlmsError::truncated(10, 4, 8);
        assert_eq!(
            err,
            DlmsError::Truncated {
                offset: 10,
                needed: 4,
                available: 0
            }
        );
        assert!(err.is_framing());
    }

    #[test]
    fn test_display() {
        let err = DlmsError::UnknownDataTag { tag: 0xAA, offset: 3 };
        assert_eq!(err.to_string(), "Unknown data type tag 0xAA at offset 3");
        assert!(!DlmsError::Reassembly("too large".into()).is_framing());
    }
}
