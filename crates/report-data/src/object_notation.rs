//! JSON array of report objects.
//!
//! Fields are pulled out key by key against their declared kind rather than
//! deserialised into a struct, so every mismatch surfaces as a parse error
//! naming the offending object and key.
//!
//! `request-time` is normally a numeric epoch in milliseconds here, unlike
//! the other two formats which carry canonical time text. Text is accepted
//! as well and decoded the usual way.

use std::io::BufRead;

use report_core::error::{ReportError, Result};
use report_core::models::{FieldKind, Report, ReportBuilder, ReportField, SourceFormat};
use report_core::time_utils::TimeCodec;
use serde_json::{Map, Value};

use crate::reader::{ReportParser, FIELD_COUNT};

/// Parser for the object-notation input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectNotationParser {
    codec: TimeCodec,
}

impl ObjectNotationParser {
    pub fn new(codec: TimeCodec) -> Self {
        Self { codec }
    }

    fn parse_object(&self, item: &Value, location: &str) -> Result<Report> {
        let object = item.as_object().ok_or_else(|| {
            ReportError::parse(
                Self::FORMAT,
                location,
                format!("expected an object, found {}", json_type(item)),
            )
        })?;

        if object.len() != FIELD_COUNT {
            return Err(ReportError::parse(
                Self::FORMAT,
                location,
                format!("expected {} keys, found {}", FIELD_COUNT, object.len()),
            ));
        }

        self.extract(object, location)
            .map_err(|e| e.in_source(Self::FORMAT, location))
    }

    fn extract(&self, object: &Map<String, Value>, location: &str) -> Result<Report> {
        let mut builder = ReportBuilder::new();

        for (key, value) in object {
            let field = ReportField::from_key(key).ok_or_else(|| {
                ReportError::parse(Self::FORMAT, location, format!("unexpected key \"{}\"", key))
            })?;

            match (field.kind(), value) {
                (FieldKind::Count, Value::Number(n)) => {
                    let count = n
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(|| {
                            ReportError::invalid_field(
                                field,
                                format!("{} is not a non-negative integer count", n),
                            )
                        })?;
                    builder.set_count(field, count)?;
                }
                (FieldKind::Time, Value::Number(n)) => {
                    let epoch = n
                        .as_i64()
                        .filter(|ms| self.codec.is_representable(*ms))
                        .ok_or_else(|| {
                            ReportError::invalid_field(
                                field,
                                format!(
                                    "{} is not an epoch in milliseconds within years 0000-9999",
                                    n
                                ),
                            )
                        })?;
                    builder.set_request_time(epoch)?;
                }
                (FieldKind::Time | FieldKind::Text | FieldKind::Address, Value::String(s)) => {
                    builder.set_text(field, s, &self.codec)?;
                }
                (kind, other) => {
                    return Err(ReportError::invalid_field(
                        field,
                        format!("expected {}, found {}", expected(kind), json_type(other)),
                    ));
                }
            }
        }

        builder.build()
    }
}

impl ReportParser for ObjectNotationParser {
    const FORMAT: SourceFormat = SourceFormat::ObjectNotation;

    fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<Report>> {
        let document: Value = serde_json::from_reader(reader).map_err(json_error)?;

        let items = match document {
            Value::Array(items) => items,
            other => {
                return Err(ReportError::parse(
                    Self::FORMAT,
                    "document root",
                    format!("expected an array of reports, found {}", json_type(&other)),
                ));
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.parse_object(item, &format!("object {}", index + 1)))
            .collect()
    }
}

fn expected(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Count => "a number",
        FieldKind::Time => "a number or a timestamp string",
        FieldKind::Text | FieldKind::Address => "a string",
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn json_error(err: serde_json::Error) -> ReportError {
    if err.is_io() {
        return ReportError::Io(err.into());
    }
    ReportError::parse(
        SourceFormat::ObjectNotation,
        format!("line {} column {}", err.line(), err.column()),
        err.to_string(),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
