mod check;
mod digest;
mod format;
mod task;

use std::{num::NonZeroUsize, path::PathBuf, thread};

use clap::Parser;
use log::{debug, trace};
use simplelog::{ColorChoice, LevelFilter, SharedLogger};

use crate::checksum::ChunkSize;
use format::OutputFormat;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Files to digest, `-` reads standard input; defaults to this executable
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub files: Vec<PathBuf>,
    /// Read digests from LIST and verify the files it names
    #[arg(short, long, value_name = "LIST", conflicts_with = "files")]
    pub check: Option<PathBuf>,
    /// Format of the printed digest lines
    #[arg(short, long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,
    /// Size of chunks to read at once, a positive multiple of 64
    #[arg(long, default_value_t = ChunkSize::default(), value_parser = parse_chunk_size)]
    pub chunk_size: ChunkSize,
    /// Maximum number of files to digest at once
    #[arg(short = 'x', long = "max-workers")]
    pub max_workers: Option<NonZeroUsize>,
    /// Only print files that fail verification
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
    #[arg(short, long, action = clap::ArgAction::Count, default_value_t = 0)]
    /// Verbosity level
    pub verbosity: u8,
    /// Enable debug output
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    /// Disable color output
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task Join Error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("No properly formatted MD5 checksum lines found in {0}")]
    NoChecksums(String),
}

pub type CliResult<T> = Result<T, CliError>;

fn parse_chunk_size(value: &str) -> Result<ChunkSize, String> {
    let size = value.parse::<usize>().map_err(|err| err.to_string())?;
    ChunkSize::new(size).map_err(|err| err.to_string())
}

fn log_level(verbosity: u8, debug: bool) -> LevelFilter {
    match (verbosity, debug) {
        (3.., _) => LevelFilter::Trace,
        (2, _) | (_, true) => LevelFilter::Debug,
        (1, _) => LevelFilter::Info,
        _ => LevelFilter::Warn,
    }
}

fn init_logging(args: &Cli) -> anyhow::Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![simplelog::TermLogger::new(
        log_level(args.verbosity, args.debug),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        if args.no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        },
    )];

    if args.debug {
        loggers.push(simplelog::WriteLogger::new(
            LevelFilter::Debug,
            simplelog::Config::default(),
            std::fs::File::create(format!(
                "{}_md5stream.log",
                chrono::Local::now().format("%Y-%m-%dT%H-%M-%S")
            ))?,
        ));
    }

    simplelog::CombinedLogger::init(loggers)?;
    Ok(())
}

fn log_progress(bytes_read: u64, total_size: u64) {
    trace!("Read {} of {} bytes", bytes_read, total_size);
}

/// Parses the command line and runs it, returning whether every file succeeded.
pub async fn cli() -> anyhow::Result<bool> {
    let args = Cli::parse();
    init_logging(&args)?;

    if args.no_color {
        colored::control::set_override(false);
    }

    run(args).await
}

async fn run(args: Cli) -> anyhow::Result<bool> {
    debug!("{:?}", args);
    let max_workers = match args.max_workers {
        Some(max_workers) => max_workers.get(),
        None => thread::available_parallelism()?.get(),
    };

    let mut stdout = std::io::stdout();
    match args.check {
        Some(checklist) => {
            let report = check::check(
                check::CheckOptions {
                    checklist,
                    chunk_size: args.chunk_size,
                    max_workers,
                    quiet: args.quiet,
                },
                &mut stdout,
            )
            .await?;

            Ok(report.passed())
        }
        None => Ok(digest::digest(
            digest::DigestOptions {
                files: args.files,
                format: args.format,
                chunk_size: args.chunk_size,
                max_workers,
                progress_callback: (args.verbosity >= 3).then_some(log_progress as fn(u64, u64)),
            },
            &mut stdout,
        )
        .await?),
    }
}
