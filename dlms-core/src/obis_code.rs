use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OBIS code, the instance id of every COSEM attribute and method descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Encoded size of an instance id
    pub const LENGTH: usize = 6;

    /// Code from its value groups A to F
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Build an OBIS code from a wire slice
    ///
    /// # Errors
    ///
    /// Returns `DlmsError::InvalidData` unless `bytes` is exactly 6 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> DlmsResult<Self> {
        let bytes: [u8; 6] = bytes.try_into().map_err(|_| {
            DlmsError::InvalidData(format!(
                "OBIS code must be 6 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse the reduced "1.0.1.8.0.255" or IEC "1-0:1.8.0*255" form
    ///
    /// # Errors
    ///
    /// `InvalidData` when the text is neither form or a group exceeds 255.
    pub fn from_string(s: &str) -> DlmsResult<Self> {
        let s = s.trim();
        if s.contains(['-', ':', '*']) {
            Self::parse_extended_format(s)
        } else {
            Self::parse_dot_format(s)
        }
    }

    fn parse_dot_format(s: &str) -> DlmsResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(DlmsError::InvalidData(format!(
                "Expected 6 dot-separated values in OBIS code: {}",
                s
            )));
        }
        Self::from_parts(&parts)
    }

    /// "A-B:C.D.E*F"; the "*F" group may be omitted and then defaults to 255
    fn parse_extended_format(s: &str) -> DlmsResult<Self> {
        let invalid = || DlmsError::InvalidData(format!("Invalid OBIS code format: {}", s));

        let (a, rest) = s.split_once('-').ok_or_else(invalid)?;
        let (b, rest) = rest.split_once(':').ok_or_else(invalid)?;
        let (cde, f) = match rest.split_once('*') {
            Some((cde, f)) => (cde, f),
            None => (rest, "255"),
        };
        let cde: Vec<&str> = cde.split('.').collect();
        if cde.len() != 3 {
            return Err(invalid());
        }
        Self::from_parts(&[a, b, cde[0], cde[1], cde[2], f])
    }

    fn from_parts(parts: &[&str]) -> DlmsResult<Self> {
        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            *byte = part
                .trim()
                .parse::<u8>()
                .map_err(|_| DlmsError::InvalidData(format!("Invalid byte value: {}", part)))?;
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Value groups A to F
    pub fn groups(&self) -> (u8, u8, u8, u8, u8, u8) {
        let [a, b, c, d, e, f] = self.bytes;
        (a, b, c, d, e, f)
    }

    /// IEC 62056-61 notation, e.g. "1-0:1.8.0*255"
    pub fn to_iec_string(&self) -> String {
        let (a, b, c, d, e, f) = self.groups();
        format!("{}-{}:{}.{}.{}*{}", a, b, c, d, e, f)
    }
}

impl FromStr for ObisCode {
    type Err = DlmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl From<[u8; 6]> for ObisCode {
    fn from(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_code_new() {
        let code = ObisCode::new(1, 1, 1, 8, 0, 255);
        assert_eq!(code.groups(), (1, 1, 1, 8, 0, 255));
        assert_eq!(code.as_bytes(), &[1, 1, 1, 8, 0, 255]);
    }

    #[test]
    fn test_obis_code_from_string() {
        let code = ObisCode::from_string("1.1.1.8.0.255").unwrap();
        assert_eq!(code, ObisCode::new(1, 1, 1, 8, 0, 255));
    }

    #[test]
    fn test_obis_code_extended_format() {
        let code: ObisCode = "1-0:1.8.0*255".parse().unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 1, 8, 0, 255));
        assert_eq!(code.to_iec_string(), "1-0:1.8.0*255");

        let code = ObisCode::from_string("0-0:40.0.0").unwrap();
        assert_eq!(code, ObisCode::new(0, 0, 40, 0, 0, 255));
    }

    #[test]
    fn test_obis_code_rejects_garbage() {
        assert!(ObisCode::from_string("1.2.3").is_err());
        assert!(ObisCode::from_string("1-0:1.8*2").is_err());
        assert!(ObisCode::from_string("1.1.1.8.0.256").is_err());
        assert!(ObisCode::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_obis_code_display() {
        let code = ObisCode::from_bytes(&[0, 0, 40, 0, 0, 255]).unwrap();
        assert_eq!(format!("{}", code), "0.0.40.0.0.255");
    }
}
