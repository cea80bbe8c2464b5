use clap::Parser;
use std::path::{Component, Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::models::SourceFormat;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Consolidate service-delivery reports into one chronological export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "report-filter",
    about = "Consolidate service-delivery reports into one chronological export",
    version
)]
pub struct Settings {
    /// Directory holding the three input files
    #[arg(long, default_value = "./reports")]
    pub data_dir: PathBuf,

    /// Tabular input file name, relative to the data directory
    #[arg(long, default_value = "reports.csv")]
    pub csv_file: String,

    /// Markup input file name, relative to the data directory
    #[arg(long, default_value = "reports.xml")]
    pub xml_file: String,

    /// Object-notation input file name, relative to the data directory
    #[arg(long, default_value = "reports.json")]
    pub json_file: String,

    /// Consolidated export path
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::parse_from(["report-filter"])
    }
}

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Settings::parse()
    }

    /// Parse an explicit argument list, for tests.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::parse_from(args)
    }

    /// File name configured for `format`.
    pub fn file_name(&self, format: SourceFormat) -> &str {
        match format {
            SourceFormat::Tabular => &self.csv_file,
            SourceFormat::Markup => &self.xml_file,
            SourceFormat::ObjectNotation => &self.json_file,
        }
    }

    /// Full path of the input for `format`.
    pub fn input_path(&self, format: SourceFormat) -> PathBuf {
        self.data_dir.join(self.file_name(format))
    }

    /// Reject configurations that cannot possibly run.
    ///
    /// Input names must be non-empty and the export must not overwrite one
    /// of the inputs, however the two paths are spelled.
    pub fn validate(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(ReportError::Config("output path is empty".to_string()));
        }
        let output = resolve(&self.output);
        for format in SourceFormat::ALL {
            let name = self.file_name(format);
            if name.trim().is_empty() {
                return Err(ReportError::Config(format!(
                    "{} input file name is empty",
                    format
                )));
            }
            if resolve(&self.input_path(format)) == output {
                return Err(ReportError::Config(format!(
                    "output {} would overwrite the {} input",
                    self.output.display(),
                    format
                )));
            }
        }
        Ok(())
    }
}

/// Absolute form of `path` for comparing locations.
///
/// Symlinks are resolved when the file, or failing that its parent
/// directory, exists. Otherwise `.` and `..` are folded lexically.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(real) = std::fs::canonicalize(path) {
        return real;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }

    match (folded.parent(), folded.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|real| real.join(name))
            .unwrap_or(folded),
        _ => folded,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_locations() {
        let s = Settings::default();
        assert_eq!(s.data_dir, PathBuf::from("./reports"));
        assert_eq!(
            s.input_path(SourceFormat::Tabular),
            PathBuf::from("./reports/reports.csv")
        );
        assert_eq!(
            s.input_path(SourceFormat::Markup),
            PathBuf::from("./reports/reports.xml")
        );
        assert_eq!(
            s.input_path(SourceFormat::ObjectNotation),
            PathBuf::from("./reports/reports.json")
        );
        assert_eq!(s.output, PathBuf::from("output.csv"));
        assert_eq!(s.log_level, "INFO");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_explicit_args() {
        let s = Settings::load_from_args([
            "report-filter",
            "--data-dir",
            "/data",
            "--json-file",
            "feed.json",
            "--output",
            "/tmp/out.csv",
            "--log-level",
            "DEBUG",
        ]);
        assert_eq!(
            s.input_path(SourceFormat::ObjectNotation),
            PathBuf::from("/data/feed.json")
        );
        assert_eq!(s.file_name(SourceFormat::Tabular), "reports.csv");
        assert_eq!(s.output, PathBuf::from("/tmp/out.csv"));
        assert_eq!(s.log_level, "DEBUG");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = Settings::try_parse_from(["report-filter", "--log-level", "LOUD"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_output_over_input() {
        let s = Settings::load_from_args([
            "report-filter",
            "--data-dir",
            "/data",
            "--output",
            "/data/reports.csv",
        ]);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_output_over_input_with_dot_prefix() {
        // Input resolves to "./output.csv", the default output to "output.csv".
        let s = Settings::load_from_args([
            "report-filter",
            "--data-dir",
            ".",
            "--csv-file",
            "output.csv",
        ]);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
        assert!(err.to_string().contains("tabular"));
    }

    #[test]
    fn test_validate_rejects_output_over_input_with_parent_dir() {
        let s = Settings::load_from_args([
            "report-filter",
            "--data-dir",
            "/data/feeds",
            "--output",
            "/data/./archive/../feeds/reports.json",
        ]);
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("object-notation"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_follows_symlinked_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        std::fs::write(real.join("reports.xml"), "<reports/>").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let s = Settings::load_from_args([
            "report-filter".into(),
            "--data-dir".into(),
            link.into_os_string(),
            "--output".into(),
            real.join("reports.xml").into_os_string(),
        ]);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_distinct_output() {
        let s = Settings::load_from_args([
            "report-filter",
            "--data-dir",
            "./reports",
            "--output",
            "./reports/output.csv",
        ]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut s = Settings::default();
        s.xml_file = String::new();
        assert!(s.validate().is_err());
    }
}
