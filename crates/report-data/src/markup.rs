//! Event-driven parsing of `<report>` documents.
//!
//! The document is read one event at a time, so memory stays bounded by the
//! size of a single report rather than the whole file. A [`MarkupMachine`]
//! tracks where the reader is:
//!
//! * `AwaitingRecord` – outside any `<report>`; other elements are ignored.
//! * `AwaitingField`  – inside a `<report>`, between field elements.
//! * `ReadingField`   – inside a field element, accumulating its text.
//!
//! A field value is coerced when its end tag arrives; a report is emitted
//! only when `</report>` closes it with all eight fields present.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;
use report_core::error::{ReportError, Result};
use report_core::models::{Report, ReportBuilder, ReportField, SourceFormat};
use report_core::time_utils::TimeCodec;

use crate::reader::ReportParser;

/// Element that delimits one report.
pub const REPORT_TAG: &str = "report";

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
enum MarkupState {
    #[default]
    AwaitingRecord,
    AwaitingField(ReportBuilder),
    ReadingField {
        builder: ReportBuilder,
        field: ReportField,
        text: String,
    },
}

/// Consumes start-tag / text / end-tag events and yields finished reports.
#[derive(Debug)]
pub struct MarkupMachine {
    state: MarkupState,
    codec: TimeCodec,
    /// 1-based ordinal of the report currently (or last) being read.
    ordinal: usize,
}

impl MarkupMachine {
    pub fn new(codec: TimeCodec) -> Self {
        Self {
            state: MarkupState::AwaitingRecord,
            codec,
            ordinal: 0,
        }
    }

    fn location(&self) -> String {
        format!("report {}", self.ordinal)
    }

    fn error(&self, reason: impl Into<String>) -> ReportError {
        ReportError::parse(SourceFormat::Markup, self.location(), reason)
    }

    /// `true` when no report is open.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, MarkupState::AwaitingRecord)
    }

    /// Handle an opening tag.
    pub fn on_start(&mut self, name: &str) -> Result<()> {
        self.state = match std::mem::take(&mut self.state) {
            MarkupState::AwaitingRecord if name == REPORT_TAG => {
                self.ordinal += 1;
                MarkupState::AwaitingField(ReportBuilder::new())
            }
            MarkupState::AwaitingRecord => MarkupState::AwaitingRecord,
            MarkupState::AwaitingField(builder) => match ReportField::from_key(name) {
                Some(field) => MarkupState::ReadingField {
                    builder,
                    field,
                    text: String::new(),
                },
                None if name == REPORT_TAG => {
                    return Err(self.error("nested <report> element"));
                }
                None => return Err(self.error(format!("unexpected element <{}>", name))),
            },
            MarkupState::ReadingField { field, .. } => {
                return Err(self.error(format!(
                    "element <{}> nested inside <{}>",
                    name, field
                )));
            }
        };
        Ok(())
    }

    /// Handle character data (already unescaped).
    pub fn on_text(&mut self, text: &str) -> Result<()> {
        if let MarkupState::ReadingField { text: acc, .. } = &mut self.state {
            acc.push_str(text);
        } else if matches!(self.state, MarkupState::AwaitingField(_)) && !text.trim().is_empty() {
            return Err(self.error(format!("unexpected text \"{}\"", text.trim())));
        }
        Ok(())
    }

    /// Handle a closing tag. Returns the report it completed, if any.
    pub fn on_end(&mut self, name: &str) -> Result<Option<Report>> {
        let location = self.location();
        let (next, completed) = match std::mem::take(&mut self.state) {
            MarkupState::AwaitingRecord => (MarkupState::AwaitingRecord, None),
            MarkupState::ReadingField {
                mut builder,
                field,
                text,
            } if name == field.key() => {
                builder
                    .set_text(field, &text, &self.codec)
                    .map_err(|e| e.in_source(SourceFormat::Markup, location.as_str()))?;
                (MarkupState::AwaitingField(builder), None)
            }
            MarkupState::AwaitingField(builder) if name == REPORT_TAG => {
                let report = builder
                    .build()
                    .map_err(|e| e.in_source(SourceFormat::Markup, location.as_str()))?;
                (MarkupState::AwaitingRecord, Some(report))
            }
            _ => return Err(self.error(format!("unexpected </{}>", name))),
        };
        self.state = next;
        Ok(completed)
    }

    /// Handle end of input.
    pub fn on_eof(&self) -> Result<()> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(self.error("document ended inside an open report"))
        }
    }
}

// ── MarkupParser ──────────────────────────────────────────────────────────────

/// Parser for the markup input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupParser {
    codec: TimeCodec,
}

impl MarkupParser {
    pub fn new(codec: TimeCodec) -> Self {
        Self { codec }
    }
}

impl ReportParser for MarkupParser {
    const FORMAT: SourceFormat = SourceFormat::Markup;

    fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<Report>> {
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(true);

        let mut machine = MarkupMachine::new(self.codec);
        let mut reports = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = xml
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(e, xml.buffer_position()))?;

            match event {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    machine.on_start(&name)?;
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    machine.on_start(&name)?;
                    reports.extend(machine.on_end(&name)?);
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| xml_error(err, xml.buffer_position()))?;
                    machine.on_text(&text)?;
                }
                Event::CData(e) => {
                    let inner = e.into_inner();
                    machine.on_text(&String::from_utf8_lossy(&inner))?;
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    reports.extend(machine.on_end(&name)?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        machine.on_eof()?;
        Ok(reports)
    }
}

fn xml_error(err: quick_xml::Error, position: usize) -> ReportError {
    match err {
        quick_xml::Error::Io(source) => {
            ReportError::Io(std::io::Error::new(source.kind(), source.to_string()))
        }
        other => ReportError::parse(
            SourceFormat::Markup,
            format!("byte {}", position),
            other.to_string(),
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
