mod packer;
mod round;
mod state;
mod stream;

use std::{
    io::{Error, ErrorKind},
    path::PathBuf,
};

use log::debug;

use crate::error::ChecksumError;

use packer::pack_with_padding;
use round::process_blocks;
pub use state::DigestState;
pub use stream::{digest_reader, ChunkSize};

#[derive(Debug)]
pub struct ChecksumOptions {
    /// The path to the file to process.
    pub filepath: PathBuf,

    /// Size of chunks to read at once.
    pub chunk_size: ChunkSize,

    /// Optional progress callback to report progress.
    /// Takes the number of bytes read and the total file size.
    pub progress_callback: Option<fn(u64, u64)>,
}

impl ChecksumOptions {
    pub fn new(filepath: PathBuf) -> Self {
        ChecksumOptions {
            filepath,
            chunk_size: ChunkSize::default(),
            progress_callback: None,
        }
    }
}

/// Calculates the digest of a file, holding at most one chunk of it in memory.
pub async fn digest_file(options: &ChecksumOptions) -> Result<DigestState, ChecksumError> {
    debug!("{:?}", options);
    let filepath = &options.filepath;
    if !filepath.is_file() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("File not found: {}", filepath.display()),
        )
        .into());
    }

    let file = tokio::fs::File::open(filepath).await?;
    let total_size = file.metadata().await?.len();

    digest_reader(
        file,
        Some(total_size),
        options.chunk_size,
        options.progress_callback,
    )
    .await
}

/// Calculates the digest of an in-memory buffer in a single pass.
#[allow(dead_code)]
pub fn digest_bytes(buffer: &[u8]) -> Result<DigestState, ChecksumError> {
    let words = pack_with_padding(buffer)?;
    Ok(process_blocks(DigestState::INITIAL, &words))
}
