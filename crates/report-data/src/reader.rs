//! Input acquisition shared by the three format parsers.
//!
//! Each parser reads from any [`BufRead`]; [`load_reports`] opens the file,
//! hands it to the parser and closes it again before returning, on success
//! and on failure alike.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use report_core::error::{ReportError, Result};
use report_core::models::{Report, SourceFormat};
use tracing::debug;

/// Number of fields in every report entry, whatever the format.
pub const FIELD_COUNT: usize = 8;

/// A parser that turns one external format into canonical reports.
pub trait ReportParser {
    /// Format this parser understands.
    const FORMAT: SourceFormat;

    /// Parse every entry in `reader`, in document order.
    fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<Report>>;
}

/// Open `path` for buffered reading.
///
/// A missing file is reported as [`ReportError::NotFound`]; any other
/// failure as [`ReportError::FileRead`].
pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ReportError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ReportError::FileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse the file at `path` with `parser`.
pub fn load_reports<P: ReportParser>(parser: &P, path: &Path) -> Result<Vec<Report>> {
    let reader = open_input(path)?;
    let reports = parser.parse(reader).map_err(|e| match e {
        ReportError::Io(source) => ReportError::FileRead {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    debug!(
        "File {}: {} {} reports parsed",
        path.display(),
        reports.len(),
        P::FORMAT
    );

    Ok(reports)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
