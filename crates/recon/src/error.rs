use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::model::SourceId;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad file pattern, overlapping labels, etc.).
    ConfigValidation(String),
    /// Catalog line without name/address/size, or a non-integer size.
    MalformedManifestLine { line_no: usize, line: String, reason: String },
    /// A classifier result table is not on disk.
    MissingResultTable { source: SourceId, path: PathBuf },
    /// A result table exists but lacks required columns.
    IncompatibleSchema { source: SourceId, path: PathBuf, missing: Vec<String> },
    /// A required numeric cell could not be parsed.
    InvalidValue { source: SourceId, path: PathBuf, row: usize, column: String, value: String },
    /// A category label outside the source's vocabulary.
    UnknownCategory { source: SourceId, path: PathBuf, row: usize, value: String },
    /// CSV read/write error.
    Csv { path: PathBuf, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

/// Machine-readable reason attached to a skipped or failed location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingResultTable,
    IncompatibleSchema,
    InvalidValue,
    UnknownCategory,
    MalformedTable,
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingResultTable => "missing_result_table",
            Self::IncompatibleSchema => "incompatible_schema",
            Self::InvalidValue => "invalid_value",
            Self::UnknownCategory => "unknown_category",
            Self::MalformedTable => "malformed_table",
            Self::Io => "io",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl ReconError {
    /// Only manifest and config errors abort a run. Everything else is
    /// contained at the location boundary.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::MalformedManifestLine { .. }
        )
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::MissingResultTable { .. } => FailureKind::MissingResultTable,
            Self::IncompatibleSchema { .. } => FailureKind::IncompatibleSchema,
            Self::InvalidValue { .. } => FailureKind::InvalidValue,
            Self::UnknownCategory { .. } => FailureKind::UnknownCategory,
            Self::Csv { .. } => FailureKind::MalformedTable,
            Self::ConfigParse(_)
            | Self::ConfigValidation(_)
            | Self::MalformedManifestLine { .. }
            | Self::Io(_) => FailureKind::Io,
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MalformedManifestLine { line_no, line, reason } => {
                write!(f, "catalog line {line_no}: {reason} ({line:?})")
            }
            Self::MissingResultTable { source, path } => {
                write!(f, "{source}: result table not found at {}", path.display())
            }
            Self::IncompatibleSchema { source, path, missing } => {
                write!(
                    f,
                    "{source}: {} is missing required column(s): {}",
                    path.display(),
                    missing.join(", ")
                )
            }
            Self::InvalidValue { source, path, row, column, value } => {
                write!(
                    f,
                    "{source}: {} row {row}: cannot parse {column} '{value}'",
                    path.display()
                )
            }
            Self::UnknownCategory { source, path, row, value } => {
                write!(
                    f,
                    "{source}: {} row {row}: unknown category label '{value}'",
                    path.display()
                )
            }
            Self::Csv { path, message } => write!(f, "CSV error in {}: {message}", path.display()),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
