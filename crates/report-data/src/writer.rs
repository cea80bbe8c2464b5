//! Serialisation of reports back into the three external formats.
//!
//! The tabular writer produces the consolidated export; the markup and
//! object-notation writers exist so sample inputs can be generated in the
//! same shapes the parsers accept.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use report_core::error::{ReportError, Result};
use report_core::models::{export_header, Report, ReportField};
use report_core::time_utils::TimeCodec;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::markup::REPORT_TAG;

/// Root element written around markup reports.
pub const MARKUP_ROOT: &str = "reports";

/// One export line, in canonical column order.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    client_address: String,
    client_guid: &'a str,
    request_time: String,
    service_guid: &'a str,
    retries_request: u32,
    packets_requested: u32,
    packets_serviced: u32,
    max_hole_size: u32,
}

impl<'a> ExportRow<'a> {
    fn new(report: &'a Report, codec: &TimeCodec) -> Self {
        Self {
            client_address: report.client_address().to_string(),
            client_guid: report.client_guid(),
            request_time: codec.encode(report.request_time()),
            service_guid: report.service_guid(),
            retries_request: report.retries_request(),
            packets_requested: report.packets_requested(),
            packets_serviced: report.packets_serviced(),
            max_hole_size: report.max_hole_size(),
        }
    }
}

// ── Tabular ───────────────────────────────────────────────────────────────────

/// Write the header line followed by one row per report.
///
/// The header is written even when `reports` is empty.
pub fn write_tabular<W: Write>(writer: W, reports: &[Report], codec: &TimeCodec) -> Result<()> {
    let mut rows = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    rows.write_record(export_header()).map_err(csv_error)?;
    for report in reports {
        rows.serialize(ExportRow::new(report, codec))
            .map_err(csv_error)?;
    }
    rows.flush()?;
    Ok(())
}

/// Write the consolidated export to `path`.
///
/// Rows go to a temporary sibling first, which is renamed over `path` only
/// once everything was written. On failure the temporary file is removed and
/// any previous export at `path` is left as it was.
pub fn export_to_file(path: &Path, reports: &[Report], codec: &TimeCodec) -> Result<()> {
    let tmp = temp_sibling(path);

    let result = File::create(&tmp)
        .map_err(ReportError::from)
        .and_then(|file| write_tabular(file, reports, codec))
        .and_then(|()| fs::rename(&tmp, path).map_err(ReportError::from));

    match result {
        Ok(()) => {
            debug!("Export {}: {} rows written", path.display(), reports.len());
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", tmp.display(), cleanup);
                }
            }
            Err(match e {
                ReportError::Io(source) => ReportError::Write {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn csv_error(err: csv::Error) -> ReportError {
    ReportError::Io(err.into())
}

// ── Markup ────────────────────────────────────────────────────────────────────

/// Write reports as `<report>` elements inside a [`MARKUP_ROOT`] element.
pub fn write_markup<W: Write>(writer: W, reports: &[Report], codec: &TimeCodec) -> Result<()> {
    let mut xml = quick_xml::Writer::new_with_indent(writer, b' ', 2);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    xml.write_event(Event::Start(BytesStart::new(MARKUP_ROOT)))
        .map_err(xml_error)?;

    for report in reports {
        xml.write_event(Event::Start(BytesStart::new(REPORT_TAG)))
            .map_err(xml_error)?;
        for field in ReportField::ALL {
            let value = field_text(report, field, codec);
            xml.write_event(Event::Start(BytesStart::new(field.key())))
                .map_err(xml_error)?;
            xml.write_event(Event::Text(BytesText::new(&value)))
                .map_err(xml_error)?;
            xml.write_event(Event::End(BytesEnd::new(field.key())))
                .map_err(xml_error)?;
        }
        xml.write_event(Event::End(BytesEnd::new(REPORT_TAG)))
            .map_err(xml_error)?;
    }

    xml.write_event(Event::End(BytesEnd::new(MARKUP_ROOT)))
        .map_err(xml_error)?;
    let mut inner = xml.into_inner();
    inner.write_all(b"\n")?;
    inner.flush()?;
    Ok(())
}

fn field_text(report: &Report, field: ReportField, codec: &TimeCodec) -> String {
    match field {
        ReportField::ClientAddress => report.client_address().to_string(),
        ReportField::ClientGuid => report.client_guid().to_string(),
        ReportField::RequestTime => codec.encode(report.request_time()),
        ReportField::ServiceGuid => report.service_guid().to_string(),
        ReportField::RetriesRequest => report.retries_request().to_string(),
        ReportField::PacketsRequested => report.packets_requested().to_string(),
        ReportField::PacketsServiced => report.packets_serviced().to_string(),
        ReportField::MaxHoleSize => report.max_hole_size().to_string(),
    }
}

fn xml_error(err: quick_xml::Error) -> ReportError {
    ReportError::Io(std::io::Error::other(err.to_string()))
}

// ── Object notation ───────────────────────────────────────────────────────────

/// Write reports as a JSON array, with `request-time` as a numeric epoch.
pub fn write_object_notation<W: Write>(mut writer: W, reports: &[Report]) -> Result<()> {
    let items: Vec<Value> = reports.iter().map(report_object).collect();
    serde_json::to_writer_pretty(&mut writer, &items).map_err(|e| ReportError::Io(e.into()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn report_object(report: &Report) -> Value {
    let mut map = Map::new();
    map.insert(
        ReportField::MaxHoleSize.key().to_string(),
        Value::from(report.max_hole_size()),
    );
    map.insert(
        ReportField::PacketsServiced.key().to_string(),
        Value::from(report.packets_serviced()),
    );
    map.insert(
        ReportField::PacketsRequested.key().to_string(),
        Value::from(report.packets_requested()),
    );
    map.insert(
        ReportField::ClientGuid.key().to_string(),
        Value::from(report.client_guid()),
    );
    map.insert(
        ReportField::ClientAddress.key().to_string(),
        Value::from(report.client_address().to_string()),
    );
    map.insert(
        ReportField::RequestTime.key().to_string(),
        Value::from(report.request_time()),
    );
    map.insert(
        ReportField::ServiceGuid.key().to_string(),
        Value::from(report.service_guid()),
    );
    map.insert(
        ReportField::RetriesRequest.key().to_string(),
        Value::from(report.retries_request()),
    );
    Value::Object(map)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupParser;
    use crate::object_notation::ObjectNotationParser;
    use crate::reader::ReportParser;
    use crate::tabular::TabularParser;
    use report_core::models::ReportBuilder;
    use tempfile::TempDir;

    const HEADER: &str = "client-address,client-guid,request-time,service-guid,retries-request,packets-requested,packets-serviced,max-hole-size";

    fn make_report(client: &str, time: i64, serviced: u32) -> Report {
        let codec = TimeCodec::new();
        let mut b = ReportBuilder::new();
        b.set_text(ReportField::ClientAddress, "10.0.0.2", &codec).unwrap();
        b.set_text(ReportField::ClientGuid, client, &codec).unwrap();
        b.set_request_time(time).unwrap();
        b.set_text(ReportField::ServiceGuid, "S1", &codec).unwrap();
        b.set_count(ReportField::RetriesRequest, 1).unwrap();
        b.set_count(ReportField::PacketsRequested, 10).unwrap();
        b.set_count(ReportField::PacketsServiced, serviced).unwrap();
        b.set_count(ReportField::MaxHoleSize, 2).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_tabular_layout() {
        let mut out = Vec::new();
        let reports = vec![make_report("C2", 1_467_195_751_000, 10)];
        write_tabular(&mut out, &reports, &TimeCodec::new()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("{HEADER}\n10.0.0.2,C2,2016-06-29 07:22:31 ADT,S1,1,10,10,2\n")
        );
    }

    #[test]
    fn test_tabular_header_without_rows() {
        let mut out = Vec::new();
        write_tabular(&mut out, &[], &TimeCodec::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{HEADER}\n"));
    }

    #[test]
    fn test_export_to_file_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "stale").unwrap();

        export_to_file(&path, &[make_report("C1", 0, 1)], &TimeCodec::new()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(HEADER));
        assert_eq!(text.lines().count(), 2);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_export_to_missing_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("output.csv");
        let err = export_to_file(&path, &[], &TimeCodec::new()).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }

    #[test]
    fn test_temp_sibling_name() {
        assert_eq!(
            temp_sibling(Path::new("/out/output.csv")),
            PathBuf::from("/out/output.csv.tmp")
        );
    }

    #[test]
    fn test_formats_parse_back_to_equal_reports() {
        let codec = TimeCodec::new();
        let reports = vec![
            make_report("C1", 1_467_195_750_000, 0),
            make_report("C&2", 1_478_410_200_000, 7),
        ];

        let mut csv_out = Vec::new();
        write_tabular(&mut csv_out, &reports, &codec).unwrap();
        let mut xml_out = Vec::new();
        write_markup(&mut xml_out, &reports, &codec).unwrap();
        let mut json_out = Vec::new();
        write_object_notation(&mut json_out, &reports).unwrap();

        let from_csv = TabularParser::new(codec).parse(csv_out.as_slice()).unwrap();
        let from_xml = MarkupParser::new(codec).parse(xml_out.as_slice()).unwrap();
        let from_json = ObjectNotationParser::new(codec)
            .parse(json_out.as_slice())
            .unwrap();

        assert_eq!(from_csv, reports);
        assert_eq!(from_xml, reports);
        assert_eq!(from_json, reports);
    }

    #[test]
    fn test_object_notation_keeps_milliseconds() {
        let reports = vec![make_report("C1", 1_467_195_750_123, 1)];
        let mut out = Vec::new();
        write_object_notation(&mut out, &reports).unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["request-time"], 1_467_195_750_123_i64);
        assert_eq!(value[0].as_object().unwrap().len(), 8);
    }
}
