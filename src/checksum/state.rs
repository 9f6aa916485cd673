use std::{fmt::Display, str::FromStr};

use crate::error::ChecksumError;

/// The size of an MD5 digest in bytes.
pub const DIGEST_SIZE: usize = 16;

/// The four 32-bit registers (A, B, C, D) carried from block to block.
///
/// Once the final block has been processed the state is the digest itself. Rendering
/// emits each register least significant byte first, in register order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct DigestState {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl DigestState {
    /// Register values every digest computation starts from.
    pub const INITIAL: DigestState = DigestState {
        a: 0x67452301,
        b: 0xefcdab89,
        c: 0x98badcfe,
        d: 0x10325476,
    };

    /// Raw digest bytes, little-endian within each register.
    pub fn to_bytes(&self) -> [u8; DIGEST_SIZE] {
        let mut output = [0u8; DIGEST_SIZE];
        output[0..4].copy_from_slice(&self.a.to_le_bytes());
        output[4..8].copy_from_slice(&self.b.to_le_bytes());
        output[8..12].copy_from_slice(&self.c.to_le_bytes());
        output[12..16].copy_from_slice(&self.d.to_le_bytes());
        output
    }

    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        DigestState {
            a: word(0),
            b: word(4),
            c: word(8),
            d: word(12),
        }
    }

    /// Renders the digest as 32 lowercase hexadecimal characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl Default for DigestState {
    fn default() -> Self {
        DigestState::INITIAL
    }
}

impl Display for DigestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for DigestState {
    type Err = ChecksumError;

    /// Parses a 32 character hexadecimal digest, in either letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ChecksumError::InvalidDigest(s.to_string()))?;
        let bytes: [u8; DIGEST_SIZE] = bytes
            .try_into()
            .map_err(|_| ChecksumError::InvalidDigest(s.to_string()))?;

        Ok(DigestState::from_bytes(bytes))
    }
}
