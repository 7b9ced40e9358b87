//! Name hash used by the SWBF `.msh` format.
//!
//! The engine identifies bones, animation tracks and models by a CRC-32 of their
//! lower-cased name instead of storing the strings again. The variant is the
//! MSB-first CRC-32 with polynomial `0x04C11DB7`, seed `0xFFFFFFFF` and a final
//! complement (the parameters usually catalogued as CRC-32/BZIP2), fed with
//! ASCII-lower-cased bytes.

#![no_std]

/// Generator polynomial (MSB-first form).
pub const POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Initial register value.
pub const SEED: u32 = 0xFFFF_FFFF;

/// Byte-at-a-time lookup table, built at compile time.
static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut value = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000_0000 != 0 {
                (value << 1) ^ POLYNOMIAL
            } else {
                value << 1
            };
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }
    table
}

/// Incremental hasher, for names assembled from several pieces.
#[derive(Clone, Copy, Debug)]
pub struct Crc {
    state: u32,
}

impl Crc {
    /// Start a new hash.
    #[inline]
    pub const fn new() -> Self {
        Self { state: SEED }
    }

    /// Feed bytes. ASCII letters are folded to lower case.
    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let index = ((self.state >> 24) ^ u32::from(byte.to_ascii_lowercase())) & 0xFF;
            self.state = (self.state << 8) ^ TABLE[index as usize];
        }
    }

    /// Final hash value.
    #[inline]
    pub const fn finish(&self) -> u32 {
        !self.state
    }
}

impl Default for Crc {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a name.
///
/// ```
/// assert_eq!(msh_crc::crc("bone_root"), msh_crc::crc("BONE_ROOT"));
/// ```
#[inline]
pub fn crc(name: &str) -> u32 {
    crc_bytes(name.as_bytes())
}

/// Hash raw UTF-8 bytes.
#[inline]
pub fn crc_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = Crc::new();
    hasher.update(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Digits are unaffected by case folding, so this is the catalogue check value.
        assert_eq!(crc("123456789"), 0xFC89_1918);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc(""), 0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(crc("DummyRoot"), crc("dummyroot"));
        assert_eq!(crc("BONE_L_UPPERARM"), crc("bone_l_upperarm"));
        assert_ne!(crc("bone_a"), crc("bone_b"));
    }

    #[test]
    fn test_incremental() {
        let mut hasher = Crc::new();
        hasher.update(b"bone_");
        hasher.update(b"Pelvis");
        assert_eq!(hasher.finish(), crc("bone_pelvis"));
    }

    #[test]
    fn test_table() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], POLYNOMIAL);
    }
}
