use std::{io::Write, path::PathBuf, sync::atomic::Ordering};

use colored::Colorize;
use log::debug;

use super::{
    format::OutputFormat,
    task::{DigestTarget, DigestTaskBuilder},
    CliResult,
};
use crate::checksum::ChunkSize;

#[derive(Debug)]
/// Options for printing digests
pub struct DigestOptions {
    /// Files to digest, the running executable when empty
    pub files: Vec<PathBuf>,
    /// Format of the printed lines
    pub format: OutputFormat,
    /// Size of chunks to read at once
    pub chunk_size: ChunkSize,
    /// Maximum number of files digested at once
    pub max_workers: usize,
    /// Optional callback reporting bytes read per file
    pub progress_callback: Option<fn(u64, u64)>,
}

/// Prints one digest line per file to `out`, in argument order.
///
/// Files that cannot be read are reported on stderr and skipped. Returns whether every
/// file was digested.
pub async fn digest<W: Write>(options: DigestOptions, out: &mut W) -> CliResult<bool> {
    debug!("{:?}", options);
    let targets: Vec<DigestTarget> = if options.files.is_empty() {
        vec![DigestTarget::File(std::env::current_exe()?)]
    } else {
        options
            .files
            .iter()
            .map(|arg| DigestTarget::from_arg(arg))
            .collect()
    };

    let task_builder = DigestTaskBuilder::new(options.max_workers, options.chunk_size)
        .with_progress(options.progress_callback);
    let tasks: Vec<_> = targets
        .into_iter()
        .map(|target| task_builder.build_task(target))
        .collect();

    for task in tasks {
        match task.await? {
            Ok(result) => writeln!(
                out,
                "{}",
                options
                    .format
                    .format_line(&result.digest, &result.target.display_name())
            )?,
            Err(error) => eprintln!("{}: {}", env!("CARGO_PKG_NAME"), error.to_string().red()),
        }
    }

    Ok(task_builder.counters.error.load(Ordering::Relaxed) == 0)
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    fn options(files: Vec<PathBuf>, format: OutputFormat) -> DigestOptions {
        DigestOptions {
            files,
            format,
            chunk_size: ChunkSize::new(64).unwrap(),
            max_workers: 4,
            progress_callback: None,
        }
    }

    fn temp_file_with(data: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(data).unwrap();
        temp_file
    }

    #[tokio::test]
    async fn digest_prints_lines_in_argument_order() {
        let abc = temp_file_with(b"abc");
        let empty = temp_file_with(b"");
        let mut out = Vec::new();

        let all_ok = digest(
            options(
                vec![abc.path().to_path_buf(), empty.path().to_path_buf()],
                OutputFormat::Gnu,
            ),
            &mut out,
        )
        .await
        .unwrap();

        assert!(all_ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!(
                "900150983cd24fb0d6963f7d28e17f72  {}\nd41d8cd98f00b204e9800998ecf8427e  {}\n",
                abc.path().display(),
                empty.path().display()
            )
        );
    }

    #[tokio::test]
    async fn digest_bsd_format() {
        let abc = temp_file_with(b"abc");
        let mut out = Vec::new();

        digest(
            options(vec![abc.path().to_path_buf()], OutputFormat::Bsd),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!(
                "MD5 ({}) = 900150983cd24fb0d6963f7d28e17f72\n",
                abc.path().display()
            )
        );
    }

    #[tokio::test]
    async fn digest_continues_past_unreadable_files() {
        let abc = temp_file_with(b"abc");
        let mut out = Vec::new();

        let all_ok = digest(
            options(
                vec![PathBuf::from("/no/such/file"), abc.path().to_path_buf()],
                OutputFormat::Gnu,
            ),
            &mut out,
        )
        .await
        .unwrap();

        assert!(!all_ok);
        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.starts_with("900150983cd24fb0d6963f7d28e17f72  "));
    }

    #[tokio::test]
    async fn digest_without_files_uses_current_executable() {
        let mut out = Vec::new();

        let mut digest_options = options(Vec::new(), OutputFormat::Gnu);
        digest_options.chunk_size = ChunkSize::default();

        let all_ok = digest(digest_options, &mut out).await.unwrap();

        assert!(all_ok);
        let output = String::from_utf8(out).unwrap();
        let executable = std::env::current_exe().unwrap();
        assert!(output.trim_end().ends_with(&executable.display().to_string()));
    }
}
