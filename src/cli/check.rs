use std::{fmt::Display, io::Write, path::PathBuf};

use colored::Colorize;
use log::debug;
use tokio::io::AsyncReadExt;

use super::{
    format::ChecksumListParser,
    task::{DigestTarget, DigestTaskBuilder},
    CliError, CliResult,
};
use crate::checksum::ChunkSize;

#[derive(Debug)]
/// Options for the check mode
pub struct CheckOptions {
    /// Path to the checksum list, `-` for standard input
    pub checklist: PathBuf,
    /// Size of chunks to read at once
    pub chunk_size: ChunkSize,
    /// Maximum number of files digested at once
    pub max_workers: usize,
    /// Only print files that did not verify
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Failed,
    Unreadable,
}

impl CheckStatus {
    pub fn label(&self) -> &str {
        match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Failed => "FAILED",
            CheckStatus::Unreadable => "FAILED open or read",
        }
    }
}

impl Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "{}", self.label().green()),
            CheckStatus::Failed => write!(f, "{}", self.label().bold().red()),
            CheckStatus::Unreadable => write!(f, "{}", self.label().yellow()),
        }
    }
}

/// Tally of one check run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub ok: usize,
    pub failed: usize,
    pub unreadable: usize,
    pub malformed: usize,
}

impl CheckReport {
    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Ok => self.ok += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Unreadable => self.unreadable += 1,
        }
    }

    /// A run passes when at least one file verified and none failed.
    pub fn passed(&self) -> bool {
        self.ok > 0 && self.failed == 0 && self.unreadable == 0
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.malformed > 0 {
            warnings.push(format!(
                "WARNING: {} {} improperly formatted",
                self.malformed,
                plural(self.malformed, "line is", "lines are")
            ));
        }
        if self.unreadable > 0 {
            warnings.push(format!(
                "WARNING: {} listed {} could not be read",
                self.unreadable,
                plural(self.unreadable, "file", "files")
            ));
        }
        if self.failed > 0 {
            warnings.push(format!(
                "WARNING: {} computed {} did NOT match",
                self.failed,
                plural(self.failed, "checksum", "checksums")
            ));
        }

        warnings
    }
}

fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/// Verifies every file named in a checksum list, writing one status line per file to `out`.
pub async fn check<W: Write>(options: CheckOptions, out: &mut W) -> CliResult<CheckReport> {
    debug!("{:?}", options);
    let list_source = DigestTarget::from_arg(&options.checklist);
    let data = match &list_source {
        DigestTarget::Stdin => {
            let mut data = String::new();
            tokio::io::stdin().read_to_string(&mut data).await?;
            data
        }
        DigestTarget::File(filepath) => tokio::fs::read_to_string(filepath).await?,
    };

    let list = ChecksumListParser::default().parse_str(&data);
    if list.entries.is_empty() {
        return Err(CliError::NoChecksums(list_source.display_name()));
    }

    let task_builder = DigestTaskBuilder::new(options.max_workers, options.chunk_size);
    let tasks: Vec<_> = list
        .entries
        .iter()
        .map(|entry| {
            let target = DigestTarget::File(PathBuf::from(&entry.path));
            (entry, task_builder.build_task(target))
        })
        .collect();

    let mut report = CheckReport {
        malformed: list.malformed,
        ..Default::default()
    };

    for (entry, task) in tasks {
        let status = match task.await? {
            Ok(result) if result.digest == entry.digest => CheckStatus::Ok,
            Ok(_) => CheckStatus::Failed,
            Err(error) => {
                eprintln!("{}: {}", env!("CARGO_PKG_NAME"), error.to_string().red());
                CheckStatus::Unreadable
            }
        };

        report.record(status);
        if status != CheckStatus::Ok || !options.quiet {
            writeln!(out, "{}: {}", entry.path, status)?;
        }
    }

    debug!("{:?}", report);
    for warning in report.warnings() {
        eprintln!("{}: {}", env!("CARGO_PKG_NAME"), warning.yellow());
    }

    Ok(report)
}
