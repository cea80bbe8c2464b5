//! Per-service occurrence counts.

use std::collections::BTreeMap;

use report_core::formatting::format_summary_line;
use report_core::models::Report;

// ── ServiceCounts ─────────────────────────────────────────────────────────────

/// Number of reports seen for each service GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCounts {
    counts: BTreeMap<String, usize>,
}

impl ServiceCounts {
    /// Count the occurrences of every service GUID in `reports`.
    pub fn from_reports(reports: &[Report]) -> Self {
        let mut counts = Self::default();
        for report in reports {
            counts.add(report);
        }
        counts
    }

    /// Count one more report for its service.
    pub fn add(&mut self, report: &Report) {
        *self
            .counts
            .entry(report.service_guid().to_string())
            .or_insert(0) += 1;
    }

    /// Count for `service_guid`, zero when it never occurred.
    pub fn get(&self, service_guid: &str) -> usize {
        self.counts.get(service_guid).copied().unwrap_or(0)
    }

    /// Number of distinct services.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// `(service, count)` pairs ordered by service GUID.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// One `<service>: NN records` line per service.
    pub fn summary_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(service, count)| format_summary_line(service, count))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::models::{ReportBuilder, ReportField};
    use report_core::time_utils::TimeCodec;

    fn make_report(service: &str, time: i64) -> Report {
        let codec = TimeCodec::new();
        let mut b = ReportBuilder::new();
        b.set_text(ReportField::ClientAddress, "10.1.1.1", &codec).unwrap();
        b.set_text(ReportField::ClientGuid, "C", &codec).unwrap();
        b.set_request_time(time).unwrap();
        b.set_text(ReportField::ServiceGuid, service, &codec).unwrap();
        for field in [
            ReportField::RetriesRequest,
            ReportField::PacketsRequested,
            ReportField::PacketsServiced,
            ReportField::MaxHoleSize,
        ] {
            b.set_count(field, 1).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn test_counts_per_service() {
        let reports = vec![
            make_report("S1", 1),
            make_report("S2", 2),
            make_report("S1", 3),
        ];
        let counts = ServiceCounts::from_reports(&reports);

        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("S1"), 2);
        assert_eq!(counts.get("S2"), 1);
        assert_eq!(counts.get("S3"), 0);
        assert_eq!(counts.total(), reports.len());
    }

    #[test]
    fn test_counting_is_order_independent() {
        let mut reports = vec![
            make_report("A", 1),
            make_report("B", 2),
            make_report("A", 3),
            make_report("C", 4),
        ];
        let forward = ServiceCounts::from_reports(&reports);
        reports.reverse();
        assert_eq!(ServiceCounts::from_reports(&reports), forward);
    }

    #[test]
    fn test_empty() {
        let counts = ServiceCounts::from_reports(&[]);
        assert!(counts.is_empty());
        assert_eq!(counts.total(), 0);
        assert!(counts.summary_lines().is_empty());
    }

    #[test]
    fn test_summary_lines() {
        let reports: Vec<Report> = (0..12)
            .map(|i| make_report("S2", i))
            .chain(std::iter::once(make_report("S1", 99)))
            .collect();
        let counts = ServiceCounts::from_reports(&reports);
        assert_eq!(
            counts.summary_lines(),
            vec!["S1: 01 records".to_string(), "S2: 12 records".to_string()]
        );
    }
}
