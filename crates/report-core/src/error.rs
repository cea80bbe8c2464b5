use std::net::AddrParseError;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ReportField, SourceFormat};

/// All errors produced while consolidating reports.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required input file does not exist.
    #[error("Input not found: {path}")]
    NotFound { path: PathBuf },

    /// An input file exists but could not be opened or read.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural or type mismatch while decoding one of the input formats.
    #[error("Failed to parse {format} input at {location}: {reason}")]
    Parse {
        format: SourceFormat,
        location: String,
        reason: String,
    },

    /// A timestamp string did not match `YYYY-MM-DD HH:MM:SS ZZZ` in the
    /// configured zone.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A single field value could not be coerced to its declared kind.
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: ReportField, reason: String },

    /// A record entry ended before all eight fields were supplied.
    #[error("Incomplete report, missing fields: {0}")]
    IncompleteReport(String),

    /// The client address is not a valid IP address.
    ///
    /// `format` and `location` are filled in once the error leaves the
    /// record builder and the source entry is known.
    #[error("Unresolvable client address \"{address}\"{}: {source}", origin(.format, .location))]
    UnresolvableAddress {
        address: String,
        format: Option<SourceFormat>,
        location: Option<String>,
        #[source]
        source: AddrParseError,
    },

    /// The consolidated export could not be created or written.
    #[error("Failed to write export {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Build a [`ReportError::Parse`] for `format` at `location`.
    pub fn parse(
        format: SourceFormat,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            format,
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_field(field: ReportField, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Attach source context to an error raised while building a record.
    ///
    /// Field-level failures (bad time text, bad counts, missing fields)
    /// become [`ReportError::Parse`]. Address failures keep their own kind
    /// but record where they came from. I/O errors pass through unchanged.
    pub fn in_source(self, format: SourceFormat, location: impl Into<String>) -> Self {
        match self {
            Self::TimestampParse(reason) => {
                Self::parse(format, location, format!("invalid timestamp: {reason}"))
            }
            err @ (Self::InvalidField { .. } | Self::IncompleteReport(_)) => {
                Self::parse(format, location, err.to_string())
            }
            Self::UnresolvableAddress {
                address,
                format: None,
                source,
                ..
            } => Self::UnresolvableAddress {
                address,
                format: Some(format),
                location: Some(location.into()),
                source,
            },
            other => other,
        }
    }
}

fn origin(format: &Option<SourceFormat>, location: &Option<String>) -> String {
    match (format, location) {
        (Some(format), Some(location)) => format!(" in {format} input at {location}"),
        (Some(format), None) => format!(" in {format} input"),
        _ => String::new(),
    }
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;
