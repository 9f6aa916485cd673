use thiserror::Error;

/// Known errors for digest operations.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// Represents errors that occur while reading the byte source
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    /// An interior chunk handed to the unpadded packer was not a whole number of blocks
    #[error("Invalid chunk length {0}, expected a multiple of 64 bytes")]
    InvalidChunkLength(usize),

    /// A chunk size that cannot hold whole blocks was requested
    #[error("Invalid chunk size {0}, expected a positive multiple of 64 bytes")]
    InvalidChunkSize(usize),

    /// The message length cannot be represented by the 64-bit counters
    #[error("Message length exceeds the representable range")]
    ArithmeticOverflow,

    /// Occurs when a digest string is not 32 hexadecimal characters
    #[error("Invalid digest {0:?}, expected 32 hexadecimal characters")]
    InvalidDigest(String),
}
