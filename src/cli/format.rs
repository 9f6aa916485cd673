use std::str::FromStr;

use regex::Regex;
use strum::IntoEnumIterator;

use crate::checksum::DigestState;

/// The line format used to print digests.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::Display,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// GNU coreutils format, `<digest>  <path>`.
    Gnu,
    /// BSD tagged format, `MD5 (<path>) = <digest>`.
    Bsd,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Gnu
    }
}

impl OutputFormat {
    /// Formats a single digest line for the given path.
    pub fn format_line(&self, digest: &DigestState, path: &str) -> String {
        match self {
            OutputFormat::Gnu => format!("{}  {}", digest, path),
            OutputFormat::Bsd => format!("MD5 ({}) = {}", path, digest),
        }
    }

    /// Pattern matching one line of this format, capturing `digest` and `path`.
    fn line_pattern(&self) -> &'static str {
        match self {
            OutputFormat::Gnu => r"^(?P<digest>[0-9a-fA-F]{32}) [ *](?P<path>.+)$",
            OutputFormat::Bsd => r"^MD5 \((?P<path>.+)\) = (?P<digest>[0-9a-fA-F]{32})$",
        }
    }
}

/// One expected digest read from a checksum list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub path: String,
    pub digest: DigestState,
}

/// The entries of a checksum list, plus a count of the lines that could not be read.
#[derive(Debug, Default)]
pub struct ChecksumList {
    pub entries: Vec<ChecksumEntry>,
    pub malformed: usize,
}

/// Reads checksum lists written in either `OutputFormat`.
pub struct ChecksumListParser {
    line_patterns: Vec<Regex>,
}

impl Default for ChecksumListParser {
    fn default() -> Self {
        ChecksumListParser {
            line_patterns: OutputFormat::iter()
                .map(|format| Regex::new(format.line_pattern()).unwrap())
                .collect(),
        }
    }
}

impl ChecksumListParser {
    /// Parses a single line, returning `None` when it matches no known format.
    pub fn parse_line(&self, line: &str) -> Option<ChecksumEntry> {
        let line = line.trim_end_matches('\r');
        self.line_patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(line)?;
            Some(ChecksumEntry {
                path: captures["path"].to_string(),
                digest: DigestState::from_str(&captures["digest"]).ok()?,
            })
        })
    }

    /// Parses every line of a checksum list, skipping blank lines.
    pub fn parse_str(&self, data: &str) -> ChecksumList {
        let mut list = ChecksumList::default();
        for line in data.lines().filter(|line| !line.trim().is_empty()) {
            match self.parse_line(line) {
                Some(entry) => list.entries.push(entry),
                None => list.malformed += 1,
            }
        }

        list
    }
}
