//! Frame Check Sequence (FCS) calculation for HDLC
//!
//! HCS and FCS both use CRC-16/X-25: reflected polynomial 0x8408,
//! initial value 0xFFFF, final XOR 0xFFFF, transmitted little-endian.

const INITIAL_FCS: u16 = 0xFFFF;
/// Register value after running over data followed by its own check sequence
pub const GOOD_FCS: u16 = 0xF0B8;
const POLYNOMIAL: u16 = 0x8408;

static FCS_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for (b, entry) in table.iter_mut().enumerate() {
        let mut v = b as u16;
        for _ in 0..8 {
            v = if v & 1 == 1 { (v >> 1) ^ POLYNOMIAL } else { v >> 1 };
        }
        *entry = v;
    }
    table
});

/// Incremental CRC-16/X-25 register
#[derive(Debug, Clone)]
pub struct FcsCalc {
    register: u16,
}

impl FcsCalc {
    pub fn new() -> Self {
        Self {
            register: INITIAL_FCS,
        }
    }

    pub fn update(&mut self, byte: u8) {
        self.register =
            (self.register >> 8) ^ FCS_TABLE[usize::from((self.register as u8) ^ byte)];
    }

    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Check sequence of the bytes seen so far
    pub fn checksum(&self) -> u16 {
        self.register ^ 0xFFFF
    }

    /// Whether the bytes seen so far end with a correct check sequence
    pub fn is_good(&self) -> bool {
        self.register == GOOD_FCS
    }
}

impl Default for FcsCalc {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-16/X-25 of `data`
pub fn fcs16(data: &[u8]) -> u16 {
    let mut calc = FcsCalc::new();
    calc.update_bytes(data);
    calc.checksum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_value() {
        assert_eq!(fcs16(b"123456789"), 0x906E);
        assert_eq!(fcs16(&[]), 0x0000);
    }

    #[test]
    fn test_matches_crc_crate() {
        let x25 = crc::Crc::<u16>::new(&crc::CRC_16_IBM_SDLC);
        let header = [0xA0, 0x19, 0x03, 0x21, 0x10];
        assert_eq!(fcs16(&header), x25.checksum(&header));
    }

    #[test]
    fn test_appended_check_sequence_gives_residue() {
        let mut data = vec![0xA0, 0x07, 0x03, 0x21, 0x93];
        let mut calc = FcsCalc::new();
        calc.update_bytes(&data);
        data.extend_from_slice(&calc.checksum().to_le_bytes());

        let mut check = FcsCalc::new();
        check.update_bytes(&data);
        assert!(check.is_good());
    }

    proptest! {
        #[test]
        fn test_single_bit_flip_changes_fcs(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let i = index.index(data.len());
            let mut flipped = data.clone();
            flipped[i] ^= 1 << bit;
            prop_assert_ne!(fcs16(&data), fcs16(&flipped));
        }

        #[test]
        fn test_residue_holds_for_any_frame(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut framed = data.clone();
            framed.extend_from_slice(&fcs16(&data).to_le_bytes());
            let mut calc = FcsCalc::new();
            calc.update_bytes(&framed);
            prop_assert!(calc.is_good());
        }
    }
}
