//! DLMS `bit-string` values

use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A run of bits of any length, zero included
///
/// The A-XDR length prefix counts bits; the value occupies
/// `(num_bits + 7) / 8` bytes, most significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitString {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitString {
    /// # Errors
    ///
    /// `InvalidData` when `bytes` holds fewer than `num_bits` bits.
    pub fn new(bytes: Vec<u8>, num_bits: usize) -> DlmsResult<Self> {
        if num_bits > bytes.len() * 8 {
            return Err(DlmsError::InvalidData(format!(
                "{} byte(s) cannot hold a {}-bit string",
                bytes.len(),
                num_bits
            )));
        }
        Ok(Self { bytes, num_bits })
    }

    /// Number of bytes needed to carry `num_bits` bits
    pub fn byte_len(num_bits: usize) -> usize {
        num_bits.div_ceil(8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Bit `index`, counting from the MSB of the first byte
    pub fn bit(&self, index: usize) -> Option<bool> {
        (index < self.num_bits).then(|| (self.bytes[index / 8] >> (7 - index % 8)) & 1 == 1)
    }

    /// Bits in wire order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.num_bits).filter_map(move |i| self.bit(i))
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_bytes() {
        let bits = BitString::new(vec![0xF0, 0x0F], 16).unwrap();
        assert_eq!(bits.num_bits(), 16);
        assert_eq!(bits.to_string(), "1111000000001111");
    }

    #[test]
    fn test_too_few_bytes() {
        assert!(matches!(BitString::new(vec![0xFF], 9), Err(DlmsError::InvalidData(_))));
    }

    #[test]
    fn test_partial_byte() {
        let bits = BitString::new(vec![0b1010_0000], 3).unwrap();
        assert_eq!(BitString::byte_len(3), 1);
        assert_eq!(bits.bit(0), Some(true));
        assert_eq!(bits.bit(1), Some(false));
        assert_eq!(bits.bit(3), None);
        assert_eq!(bits.to_string(), "101");
    }

    #[test]
    fn test_empty() {
        let bits = BitString::new(Vec::new(), 0).unwrap();
        assert_eq!(bits.to_string(), "");
        assert_eq!(BitString::byte_len(0), 0);
    }
}
