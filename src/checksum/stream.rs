use std::{fmt::Display, io::ErrorKind};

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{
    packer::{pack_final_with_padding, pack_no_padding, BLOCK_SIZE},
    round::process_blocks,
    state::DigestState,
};
use crate::error::ChecksumError;

/// The default chunk size used to read files, 160 blocks.
pub const DEFAULT_CHUNK_SIZE: usize = 10240;

const _: () = assert!(DEFAULT_CHUNK_SIZE > 0 && DEFAULT_CHUNK_SIZE % BLOCK_SIZE == 0);

/// A read size that always holds a whole number of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(usize);

impl ChunkSize {
    pub fn new(size: usize) -> Result<Self, ChecksumError> {
        if size == 0 || size % BLOCK_SIZE != 0 {
            return Err(ChecksumError::InvalidChunkSize(size));
        }

        Ok(ChunkSize(size))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize(DEFAULT_CHUNK_SIZE)
    }
}

impl Display for ChunkSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle of one streaming digest computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Nothing has been read yet.
    Init,
    /// Full chunks are being read and compressed.
    Streaming,
    /// The trailing fragment has been read and awaits padding.
    Finalizing,
    /// The digest is final.
    Done,
}

/// Computes the digest of a byte source one chunk at a time.
///
/// Only one chunk of input is held in memory. Every full chunk is compressed without
/// padding; the first short chunk (which may be empty) is the end of the message and is
/// padded with the total number of bytes consumed. When the total length of the source is
/// known, a full chunk that reaches it ends the message without another read.
pub struct StreamHasher<R> {
    reader: R,
    total_len: Option<u64>,
    chunk_size: ChunkSize,
    progress_callback: Option<fn(u64, u64)>,
    phase: StreamPhase,
    state: DigestState,
    consumed: u64,
    buffer: Vec<u8>,
    fragment_len: usize,
}

impl<R: AsyncRead + Unpin> StreamHasher<R> {
    pub fn new(reader: R, total_len: Option<u64>, chunk_size: ChunkSize) -> Self {
        Self {
            reader,
            total_len,
            chunk_size,
            progress_callback: None,
            phase: StreamPhase::Init,
            state: DigestState::INITIAL,
            consumed: 0,
            buffer: Vec::new(),
            fragment_len: 0,
        }
    }

    /// Reports `(bytes consumed, total bytes)` after every chunk; the total is 0 when unknown.
    pub fn with_progress(mut self, progress_callback: Option<fn(u64, u64)>) -> Self {
        self.progress_callback = progress_callback;
        self
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Number of message bytes compressed so far, padding excluded.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Performs a single transition of the state machine and returns the new phase.
    pub async fn step(&mut self) -> Result<StreamPhase, ChecksumError> {
        match self.phase {
            StreamPhase::Init => {
                self.state = DigestState::INITIAL;
                self.consumed = 0;
                self.buffer = vec![0; self.chunk_size.get()];
                self.phase = StreamPhase::Streaming;
            }
            StreamPhase::Streaming => {
                let bytes_read = fill_chunk(&mut self.reader, &mut self.buffer).await?;
                if bytes_read < self.buffer.len() {
                    self.fragment_len = bytes_read;
                    self.phase = StreamPhase::Finalizing;
                    return Ok(self.phase);
                }

                let words = pack_no_padding(&self.buffer)?;
                self.state = process_blocks(self.state, &words);
                self.advance(bytes_read)?;

                if self.total_len == Some(self.consumed) {
                    trace!("Reached known length of {} bytes", self.consumed);
                    self.fragment_len = 0;
                    self.phase = StreamPhase::Finalizing;
                }
            }
            StreamPhase::Finalizing => {
                let fragment = &self.buffer[..self.fragment_len];
                let words = pack_final_with_padding(fragment, self.consumed)?;
                self.state = process_blocks(self.state, &words);
                self.advance(self.fragment_len)?;

                self.buffer = Vec::new();
                self.phase = StreamPhase::Done;
            }
            StreamPhase::Done => {}
        }

        Ok(self.phase)
    }

    /// Drives the state machine to completion and returns the final digest.
    pub async fn finish(mut self) -> Result<DigestState, ChecksumError> {
        while self.phase() != StreamPhase::Done {
            self.step().await?;
        }

        debug!("Digest complete after {} bytes", self.consumed());
        Ok(self.state)
    }

    fn advance(&mut self, bytes: usize) -> Result<(), ChecksumError> {
        self.consumed = self
            .consumed
            .checked_add(bytes as u64)
            .ok_or(ChecksumError::ArithmeticOverflow)?;

        if let Some(report_progress) = self.progress_callback {
            report_progress(self.consumed, self.total_len.unwrap_or(0));
        }

        Ok(())
    }
}

/// Reads until `buffer` is full or the source is exhausted, returning the bytes read.
async fn fill_chunk<R: AsyncRead + Unpin>(
    reader: &mut R,
    buffer: &mut [u8],
) -> Result<usize, std::io::Error> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]).await {
            Ok(0) => break,
            Ok(bytes_read) => filled += bytes_read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }

    Ok(filled)
}

/// Streams `reader` through the digest, reading `chunk_size` bytes at a time.
pub async fn digest_reader<R: AsyncRead + Unpin>(
    reader: R,
    total_len: Option<u64>,
    chunk_size: ChunkSize,
    progress_callback: Option<fn(u64, u64)>,
) -> Result<DigestState, ChecksumError> {
    StreamHasher::new(reader, total_len, chunk_size)
        .with_progress(progress_callback)
        .finish()
        .await
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        sync::atomic::{AtomicU64, Ordering},
        task::{Context, Poll},
    };

    use tokio::io::ReadBuf;

    use super::*;

    /// Hands out at most `max_read` bytes per read, and fails when read past the end if asked.
    struct ScriptedReader {
        data: Vec<u8>,
        position: usize,
        max_read: usize,
        fail_past_end: bool,
        reads: usize,
    }

    impl ScriptedReader {
        fn new(data: Vec<u8>, max_read: usize) -> Self {
            Self {
                data,
                position: 0,
                max_read,
                fail_past_end: false,
                reads: 0,
            }
        }

        fn failing_past_end(mut self) -> Self {
            self.fail_past_end = true;
            self
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads += 1;
            let remaining = self.data.len() - self.position;
            if remaining == 0 && self.fail_past_end {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "read past the end of the source",
                )));
            }

            let count = remaining.min(self.max_read).min(buf.remaining());
            let start = self.position;
            buf.put_slice(&self.data[start..start + count]);
            self.position += count;
            Poll::Ready(Ok(()))
        }
    }

    fn message(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn chunk(size: usize) -> ChunkSize {
        ChunkSize::new(size).unwrap()
    }

    #[test]
    fn chunk_size_rejects_partial_blocks() {
        assert!(matches!(
            ChunkSize::new(0),
            Err(ChecksumError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            ChunkSize::new(100),
            Err(ChecksumError::InvalidChunkSize(100))
        ));
        assert_eq!(ChunkSize::new(128).unwrap().get(), 128);
    }

    #[test]
    fn chunk_size_default() {
        assert_eq!(ChunkSize::default().get(), DEFAULT_CHUNK_SIZE);
        assert_eq!(ChunkSize::default().to_string(), "10240");
    }

    #[tokio::test]
    async fn step_walks_through_phases() {
        let data = message(100);
        let mut hasher = StreamHasher::new(data.as_slice(), Some(100), chunk(64));
        assert_eq!(hasher.phase(), StreamPhase::Init);

        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Streaming);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Streaming);
        assert_eq!(hasher.consumed(), 64);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Finalizing);
        assert_eq!(hasher.consumed(), 64);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Done);
        assert_eq!(hasher.consumed(), 100);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Done);

        assert_eq!(hasher.finish().await.unwrap().to_bytes(), md5::compute(&data).0);
    }

    #[tokio::test]
    async fn exact_multiple_with_known_length_skips_extra_read() {
        let data = message(256);
        let reader = ScriptedReader::new(data.clone(), usize::MAX).failing_past_end();
        let mut hasher = StreamHasher::new(reader, Some(256), chunk(128));

        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Streaming);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Streaming);
        assert_eq!(hasher.step().await.unwrap(), StreamPhase::Finalizing);
        assert_eq!(hasher.consumed(), 256);

        let digest = hasher.finish().await.unwrap();
        assert_eq!(digest.to_bytes(), md5::compute(&data).0);
    }

    #[tokio::test]
    async fn exact_multiple_with_unknown_length_finalizes_on_empty_read() {
        let data = message(256);
        let reader = ScriptedReader::new(data.clone(), usize::MAX);

        let digest = digest_reader(reader, None, chunk(128), None).await.unwrap();
        assert_eq!(digest.to_bytes(), md5::compute(&data).0);
    }

    #[tokio::test]
    async fn short_reads_do_not_end_the_stream() {
        let data = message(1000);
        let reader = ScriptedReader::new(data.clone(), 7);

        let digest = digest_reader(reader, None, chunk(64), None).await.unwrap();
        assert_eq!(digest.to_bytes(), md5::compute(&data).0);
    }

    #[tokio::test]
    async fn empty_source_digest() {
        let digest = digest_reader(&b""[..], Some(0), chunk(64), None)
            .await
            .unwrap();
        assert_eq!(digest.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn understated_length_keeps_reading() {
        let data = message(300);
        let digest = digest_reader(data.as_slice(), Some(0), chunk(64), None)
            .await
            .unwrap();
        assert_eq!(digest.to_bytes(), md5::compute(&data).0);
    }

    #[tokio::test]
    async fn read_errors_are_propagated() {
        let reader = ScriptedReader::new(Vec::new(), 64).failing_past_end();
        let result = digest_reader(reader, None, chunk(64), None).await;

        match result {
            Err(ChecksumError::IoError(error)) => {
                assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn reads_one_chunk_at_a_time() {
        let data = message(640);
        let mut reader = ScriptedReader::new(data, usize::MAX);

        StreamHasher::new(&mut reader, None, chunk(128))
            .finish()
            .await
            .unwrap();

        // Five full chunks plus the empty read that ends the message.
        assert_eq!(reader.reads, 6);
    }

    static PROGRESS_BYTES: AtomicU64 = AtomicU64::new(0);
    static PROGRESS_TOTAL: AtomicU64 = AtomicU64::new(0);

    fn record_progress(bytes: u64, total: u64) {
        PROGRESS_BYTES.store(bytes, Ordering::SeqCst);
        PROGRESS_TOTAL.store(total, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn progress_callback_reports_consumed_bytes() {
        let data = message(700);
        digest_reader(data.as_slice(), Some(700), chunk(256), Some(record_progress))
            .await
            .unwrap();

        assert_eq!(PROGRESS_BYTES.load(Ordering::SeqCst), 700);
        assert_eq!(PROGRESS_TOTAL.load(Ordering::SeqCst), 700);
    }
}
