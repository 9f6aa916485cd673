use crate::error::ChecksumError;

/// The size of one compression block in bytes.
pub const BLOCK_SIZE: usize = 64;

/// The size of one compression block in 32-bit words.
pub const BLOCK_WORDS: usize = 16;

/// Where the bytes being packed sit within the message, which decides how they are padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingMode {
    /// The bytes are the entire message.
    Whole,
    /// The bytes are an interior run of whole blocks and are never padded.
    Interior,
    /// The bytes are the tail of a message whose first `prior_bytes` were already consumed.
    Final { prior_bytes: u64 },
}

/// Packs bytes into little-endian 32-bit words, padding them as `mode` requires.
///
/// Padded output always ends on a block boundary: the 0x80 marker directly after the last
/// byte, zero fill up to a word count of 14 mod 16, then the message length in bits
/// (modulo 2^64) as a low word followed by a high word.
pub fn pack_words(bytes: &[u8], mode: PaddingMode) -> Result<Vec<u32>, ChecksumError> {
    let message_len = match mode {
        PaddingMode::Interior => {
            if bytes.len() % BLOCK_SIZE != 0 {
                return Err(ChecksumError::InvalidChunkLength(bytes.len()));
            }

            let mut words = vec![0u32; bytes.len() / 4];
            copy_le_words(bytes, &mut words);
            return Ok(words);
        }
        PaddingMode::Whole => bytes.len() as u64,
        PaddingMode::Final { prior_bytes } => (bytes.len() as u64)
            .checked_add(prior_bytes)
            .ok_or(ChecksumError::ArithmeticOverflow)?,
    };

    let byte_len = bytes.len() as u64;
    // The marker shares a word with the trailing bytes, or starts a fresh one.
    let marker_word = byte_len / 4;
    let length_word = (marker_word + 2) / BLOCK_WORDS as u64 * BLOCK_WORDS as u64 + 14;
    let total_words =
        usize::try_from(length_word + 2).map_err(|_| ChecksumError::ArithmeticOverflow)?;

    let mut words = vec![0u32; total_words];
    copy_le_words(bytes, &mut words);

    words[marker_word as usize] |= 0x80u32 << ((byte_len % 4) * 8);

    let bit_len = message_len.wrapping_mul(8);
    let length_word = length_word as usize;
    words[length_word] = bit_len as u32;
    words[length_word + 1] = (bit_len >> 32) as u32;

    Ok(words)
}

/// Packs an entire message, padding it with its own length.
pub fn pack_with_padding(bytes: &[u8]) -> Result<Vec<u32>, ChecksumError> {
    pack_words(bytes, PaddingMode::Whole)
}

/// Packs whole blocks from the middle of a message without any padding.
pub fn pack_no_padding(bytes: &[u8]) -> Result<Vec<u32>, ChecksumError> {
    pack_words(bytes, PaddingMode::Interior)
}

/// Packs the last fragment of a message, padding it with the length of the whole message.
pub fn pack_final_with_padding(bytes: &[u8], prior_bytes: u64) -> Result<Vec<u32>, ChecksumError> {
    pack_words(bytes, PaddingMode::Final { prior_bytes })
}

fn copy_le_words(bytes: &[u8], words: &mut [u32]) {
    for (word, chunk) in words.iter_mut().zip(bytes.chunks(4)) {
        let mut buffer = [0u8; 4];
        buffer[..chunk.len()].copy_from_slice(chunk);
        *word = u32::from_le_bytes(buffer);
    }
}
