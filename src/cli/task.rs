use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use log::{debug, error, info};

use crate::{
    checksum::{digest_file, digest_reader, ChecksumOptions, ChunkSize, DigestState},
    error::ChecksumError,
};

/// Argument naming standard input instead of a file.
pub const STDIN_ARG: &str = "-";

/// A byte source named on the command line or in a checksum list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestTarget {
    Stdin,
    File(PathBuf),
}

impl DigestTarget {
    pub fn from_arg(arg: &Path) -> Self {
        if arg == Path::new(STDIN_ARG) {
            DigestTarget::Stdin
        } else {
            DigestTarget::File(arg.to_path_buf())
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            DigestTarget::Stdin => STDIN_ARG.to_string(),
            DigestTarget::File(filepath) => filepath.to_string_lossy().to_string(),
        }
    }

    /// Both sources are streamed chunk by chunk. Standard input has no length to probe, so
    /// its end is the first short chunk.
    pub async fn digest(
        &self,
        chunk_size: ChunkSize,
        progress_callback: Option<fn(u64, u64)>,
    ) -> Result<DigestState, ChecksumError> {
        match self {
            DigestTarget::Stdin => {
                digest_reader(tokio::io::stdin(), None, chunk_size, progress_callback).await
            }
            DigestTarget::File(filepath) => {
                digest_file(&ChecksumOptions {
                    chunk_size,
                    progress_callback,
                    ..ChecksumOptions::new(filepath.clone())
                })
                .await
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    ChecksumError(#[from] ChecksumError),

    #[error("Failed to acquire task worker permit, {0}")]
    TaskPermitFailure(#[from] tokio::sync::AcquireError),
}

#[derive(Debug)]
pub struct DigestTaskResult {
    pub target: DigestTarget,
    pub digest: DigestState,
}

#[derive(Debug)]
pub struct DigestTaskError {
    pub target: DigestTarget,
    pub error: TaskError,
}

impl Display for DigestTaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.target.display_name(), self.error)
    }
}

#[derive(Debug, Default)]
pub struct DigestTaskCounters {
    pub success: AtomicUsize,
    pub error: AtomicUsize,
}

pub type DigestTask = tokio::task::JoinHandle<Result<DigestTaskResult, DigestTaskError>>;

/// Spawns one digest task per target, running at most `max_workers` at a time.
pub struct DigestTaskBuilder {
    worker_semaphore: Arc<tokio::sync::Semaphore>,
    chunk_size: ChunkSize,
    progress_callback: Option<fn(u64, u64)>,
    pub counters: Arc<DigestTaskCounters>,
}

impl DigestTaskBuilder {
    pub fn new(max_workers: usize, chunk_size: ChunkSize) -> Self {
        Self {
            worker_semaphore: Arc::new(tokio::sync::Semaphore::new(max_workers)),
            chunk_size,
            progress_callback: None,
            counters: Arc::new(DigestTaskCounters::default()),
        }
    }

    pub fn with_progress(mut self, progress_callback: Option<fn(u64, u64)>) -> Self {
        self.progress_callback = progress_callback;
        self
    }

    pub fn build_task(&self, target: DigestTarget) -> DigestTask {
        let worker_semaphore = self.worker_semaphore.clone();
        let chunk_size = self.chunk_size;
        let progress_callback = self.progress_callback;
        let counters = self.counters.clone();

        tokio::spawn(async move {
            debug!("Queued {:?}", target);
            let digest = match worker_semaphore.acquire().await {
                Ok(_permit) => target
                    .digest(chunk_size, progress_callback)
                    .await
                    .map_err(TaskError::from),
                Err(err) => Err(TaskError::from(err)),
            };

            match digest {
                Ok(digest) => {
                    let result = DigestTaskResult { target, digest };
                    info!("{:?}", result);
                    counters.success.fetch_add(1, Ordering::Relaxed);
                    Ok(result)
                }
                Err(error) => {
                    let task_error = DigestTaskError { target, error };
                    error!("{:?}", task_error);
                    counters.error.fetch_add(1, Ordering::Relaxed);
                    Err(task_error)
                }
            }
        })
    }
}
