//! Console rendering of the per-service summary.

/// Header line printed before the per-service counts.
pub const SUMMARY_HEADER: &str = "--Summary--";

/// Format one summary line: `<service>: NN records`.
///
/// The count is zero-padded to at least two digits.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_summary_line;
///
/// assert_eq!(format_summary_line("S1", 1), "S1: 01 records");
/// assert_eq!(format_summary_line("S1", 12), "S1: 12 records");
/// assert_eq!(format_summary_line("S1", 345), "S1: 345 records");
/// ```
pub fn format_summary_line(service_guid: &str, count: usize) -> String {
    format!("{}: {:02} records", service_guid, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_digit_is_padded() {
        assert_eq!(format_summary_line("abc", 7), "abc: 07 records");
    }

    #[test]
    fn test_zero_is_padded() {
        assert_eq!(format_summary_line("abc", 0), "abc: 00 records");
    }

    #[test]
    fn test_wide_counts_not_truncated() {
        assert_eq!(format_summary_line("abc", 1000), "abc: 1000 records");
    }
}
