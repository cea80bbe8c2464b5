use std::sync::OnceLock;

use chrono::{DateTime, Datelike, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};

/// The single zone every report timestamp is interpreted in.
pub const REPORT_TIMEZONE: Tz = chrono_tz::America::Halifax;

/// Canonical text form, e.g. `2016-06-29 07:22:30 ADT`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MAX_YEAR: i32 = 9999;

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) ([A-Za-z]{2,5})$")
            .expect("regex is valid")
    })
}

// ── TimeCodec ─────────────────────────────────────────────────────────────────

/// Converts between epoch milliseconds and the canonical timestamp text.
///
/// The offset always comes from the codec's zone. The abbreviation at the end
/// of the text is only looked at when a wall-clock time occurs twice (the
/// autumn transition), to choose which of the two instants was meant.
#[derive(Debug, Clone, Copy)]
pub struct TimeCodec {
    tz: Tz,
}

impl Default for TimeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeCodec {
    /// A codec bound to [`REPORT_TIMEZONE`].
    pub fn new() -> Self {
        Self { tz: REPORT_TIMEZONE }
    }

    /// `true` when `epoch_millis` falls on a local year in `0000..=9999`,
    /// the range the four-digit canonical text can express.
    pub fn is_representable(&self, epoch_millis: i64) -> bool {
        self.local(epoch_millis)
            .map(|dt| (0..=MAX_YEAR).contains(&dt.year()))
            .unwrap_or(false)
    }

    /// Render `epoch_millis` as `YYYY-MM-DD HH:MM:SS ZZZ` in the codec zone.
    ///
    /// Sub-second precision is dropped. Values outside
    /// [`is_representable`](Self::is_representable) are rendered as the raw
    /// number; parsers reject such values up front.
    pub fn encode(&self, epoch_millis: i64) -> String {
        match self.local(epoch_millis) {
            Some(dt) if (0..=MAX_YEAR).contains(&dt.year()) => {
                dt.format(TIMESTAMP_FORMAT).to_string()
            }
            _ => {
                warn!("TimeCodec: epoch {} is out of range", epoch_millis);
                epoch_millis.to_string()
            }
        }
    }

    fn local(&self, epoch_millis: i64) -> Option<DateTime<Tz>> {
        DateTime::from_timestamp_millis(epoch_millis).map(|utc| utc.with_timezone(&self.tz))
    }

    /// Parse canonical timestamp text into epoch milliseconds.
    pub fn decode(&self, text: &str) -> Result<i64> {
        let caps = timestamp_pattern().captures(text.trim()).ok_or_else(|| {
            ReportError::TimestampParse(format!(
                "\"{}\" does not match YYYY-MM-DD HH:MM:SS ZZZ",
                text
            ))
        })?;

        let local = NaiveDateTime::parse_from_str(&caps[1], LOCAL_FORMAT)
            .map_err(|e| ReportError::TimestampParse(format!("\"{}\": {}", text, e)))?;
        let zone_tag = &caps[2];

        let resolved = match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, latest) => {
                if abbreviation(&latest).eq_ignore_ascii_case(zone_tag) {
                    latest
                } else {
                    earliest
                }
            }
            LocalResult::None => {
                return Err(ReportError::TimestampParse(format!(
                    "\"{}\" does not exist in {}",
                    text,
                    self.tz.name()
                )));
            }
        };

        if !abbreviation(&resolved).eq_ignore_ascii_case(zone_tag) {
            debug!(
                "TimeCodec: zone tag \"{}\" in \"{}\" ignored, using {}",
                zone_tag,
                text,
                self.tz.name()
            );
        }

        Ok(resolved.timestamp_millis())
    }
}

fn abbreviation(dt: &DateTime<Tz>) -> String {
    dt.format("%Z").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
