//! Comma-separated report rows.
//!
//! The first row is a header and is discarded. Every following row carries
//! the eight fields in canonical column order.

use std::io::BufRead;

use csv::{ReaderBuilder, StringRecord, Trim};
use report_core::error::{ReportError, Result};
use report_core::models::{Report, ReportBuilder, ReportField, SourceFormat};
use report_core::time_utils::TimeCodec;

use crate::reader::{ReportParser, FIELD_COUNT};

/// Parser for the tabular input.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularParser {
    codec: TimeCodec,
}

impl TabularParser {
    pub fn new(codec: TimeCodec) -> Self {
        Self { codec }
    }

    fn parse_row(&self, record: &StringRecord, location: &str) -> Result<Report> {
        if record.len() != FIELD_COUNT {
            return Err(ReportError::parse(
                Self::FORMAT,
                location,
                format!("expected {} fields, found {}", FIELD_COUNT, record.len()),
            ));
        }

        let mut builder = ReportBuilder::new();
        for (field, raw) in ReportField::ALL.into_iter().zip(record.iter()) {
            builder
                .set_text(field, raw, &self.codec)
                .map_err(|e| e.in_source(Self::FORMAT, location))?;
        }
        builder
            .build()
            .map_err(|e| e.in_source(Self::FORMAT, location))
    }
}

impl ReportParser for TabularParser {
    const FORMAT: SourceFormat = SourceFormat::Tabular;

    fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<Report>> {
        let mut rows = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut reports = Vec::new();
        for result in rows.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            reports.push(self.parse_row(&record, &format!("line {}", line))?);
        }

        Ok(reports)
    }
}

fn csv_error(err: csv::Error) -> ReportError {
    let location = err
        .position()
        .map(|p| format!("line {}", p.line()))
        .unwrap_or_else(|| "unknown line".to_string());
    let reason = err.to_string();

    match err.into_kind() {
        csv::ErrorKind::Io(source) => ReportError::Io(source),
        _ => ReportError::parse(SourceFormat::Tabular, location, reason),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "client-address,client-guid,request-time,service-guid,retries-request,packets-requested,packets-serviced,max-hole-size";

    fn parse(body: &str) -> Result<Vec<Report>> {
        let input = format!("{}\n{}", HEADER, body);
        TabularParser::default().parse(input.as_bytes())
    }

    #[test]
    fn test_parses_rows_in_order() {
        let reports = parse(
            "10.0.0.1,C1,2016-06-29 07:22:30 ADT,S1,0,10,0,0\n\
             10.0.0.2,C2,2016-06-29 07:22:31 ADT,S1,1,10,10,2\n",
        )
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].client_guid(), "C1");
        assert_eq!(reports[0].packets_serviced(), 0);
        assert_eq!(reports[1].client_guid(), "C2");
        assert_eq!(reports[1].request_time(), 1_467_195_751_000);
        assert_eq!(reports[1].retries_request(), 1);
        assert_eq!(reports[1].max_hole_size(), 2);
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let reports = TabularParser::default().parse("".as_bytes()).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_header_row_is_not_validated() {
        let input = "a,b,c\n10.0.0.1,C1,2016-06-29 07:22:30 ADT,S1,0,10,3,0\n";
        let reports = TabularParser::default().parse(input.as_bytes()).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let reports = parse(" 10.0.0.1 , C1 ,2016-06-29 07:22:30 ADT, S1 ,0, 10,3 ,0\n").unwrap();
        assert_eq!(reports[0].client_guid(), "C1");
        assert_eq!(reports[0].service_guid(), "S1");
        assert_eq!(reports[0].packets_requested(), 10);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse("10.0.0.1,C1,2016-06-29 07:22:30 ADT,S1,0,10,3\n").unwrap_err();
        match err {
            ReportError::Parse {
                format,
                location,
                reason,
            } => {
                assert_eq!(format, SourceFormat::Tabular);
                assert_eq!(location, "line 2");
                assert!(reason.contains("expected 8 fields, found 7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_count() {
        let err = parse("10.0.0.1,C1,2016-06-29 07:22:30 ADT,S1,zero,10,3,0\n").unwrap_err();
        assert!(matches!(err, ReportError::Parse { .. }));
        assert!(err.to_string().contains("retries-request"));
    }

    #[test]
    fn test_malformed_time() {
        let err = parse(
            "10.0.0.1,C1,2016-06-29 07:22:30 ADT,S1,0,10,3,0\n\
             10.0.0.2,C2,29/06/2016 07:22,S1,0,10,3,0\n",
        )
        .unwrap_err();
        match err {
            ReportError::Parse { location, .. } => assert_eq!(location, "line 3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_address() {
        let err = parse("10.0.0.999,C1,2016-06-29 07:22:30 ADT,S1,0,10,3,0\n").unwrap_err();
        match &err {
            ReportError::UnresolvableAddress {
                address,
                format,
                location,
                ..
            } => {
                assert_eq!(address, "10.0.0.999");
                assert_eq!(*format, Some(SourceFormat::Tabular));
                assert_eq!(location.as_deref(), Some("line 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("tabular input at line 2"));
    }
}
