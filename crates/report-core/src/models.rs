use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::time_utils::TimeCodec;

/// The external format a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Comma-separated rows with a header line.
    Tabular,
    /// A document of `<report>` elements.
    Markup,
    /// A top-level array of report objects.
    ObjectNotation,
}

impl SourceFormat {
    /// Every format, in the order the pipeline visits them.
    pub const ALL: [SourceFormat; 3] = [
        SourceFormat::Tabular,
        SourceFormat::Markup,
        SourceFormat::ObjectNotation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Tabular => "tabular",
            SourceFormat::Markup => "markup",
            SourceFormat::ObjectNotation => "object-notation",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar type a raw field value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// IP address, kept in normalised textual form.
    Address,
    /// Opaque identifier string.
    Text,
    /// Epoch milliseconds, written as canonical time text.
    Time,
    /// Non-negative integer count.
    Count,
}

/// The eight fields of a [`Report`], in export column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    ClientAddress,
    ClientGuid,
    RequestTime,
    ServiceGuid,
    RetriesRequest,
    PacketsRequested,
    PacketsServiced,
    MaxHoleSize,
}

impl ReportField {
    /// Canonical column order shared by the tabular input and the export.
    pub const ALL: [ReportField; 8] = [
        ReportField::ClientAddress,
        ReportField::ClientGuid,
        ReportField::RequestTime,
        ReportField::ServiceGuid,
        ReportField::RetriesRequest,
        ReportField::PacketsRequested,
        ReportField::PacketsServiced,
        ReportField::MaxHoleSize,
    ];

    /// External key used as markup tag, object key and export header.
    pub fn key(&self) -> &'static str {
        match self {
            ReportField::ClientAddress => "client-address",
            ReportField::ClientGuid => "client-guid",
            ReportField::RequestTime => "request-time",
            ReportField::ServiceGuid => "service-guid",
            ReportField::RetriesRequest => "retries-request",
            ReportField::PacketsRequested => "packets-requested",
            ReportField::PacketsServiced => "packets-serviced",
            ReportField::MaxHoleSize => "max-hole-size",
        }
    }

    /// Look a field up by its external key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ReportField::ClientAddress => FieldKind::Address,
            ReportField::ClientGuid | ReportField::ServiceGuid => FieldKind::Text,
            ReportField::RequestTime => FieldKind::Time,
            ReportField::RetriesRequest
            | ReportField::PacketsRequested
            | ReportField::PacketsServiced
            | ReportField::MaxHoleSize => FieldKind::Count,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Header line of the consolidated export.
pub fn export_header() -> [&'static str; 8] {
    ReportField::ALL.map(|f| f.key())
}

// ── Report ────────────────────────────────────────────────────────────────────

/// One observed service-delivery event, independent of its source format.
///
/// Built only through [`ReportBuilder`]; there are no setters, so a report is
/// immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    client_address: IpAddr,
    client_guid: String,
    request_time: i64,
    service_guid: String,
    retries_request: u32,
    packets_requested: u32,
    packets_serviced: u32,
    max_hole_size: u32,
}

impl Report {
    pub fn client_address(&self) -> IpAddr {
        self.client_address
    }

    pub fn client_guid(&self) -> &str {
        &self.client_guid
    }

    /// Request time in epoch milliseconds.
    pub fn request_time(&self) -> i64 {
        self.request_time
    }

    pub fn service_guid(&self) -> &str {
        &self.service_guid
    }

    pub fn retries_request(&self) -> u32 {
        self.retries_request
    }

    pub fn packets_requested(&self) -> u32 {
        self.packets_requested
    }

    pub fn packets_serviced(&self) -> u32 {
        self.packets_serviced
    }

    pub fn max_hole_size(&self) -> u32 {
        self.max_hole_size
    }

    /// A report that serviced no packets is excluded from the export.
    pub fn is_valid(&self) -> bool {
        self.packets_serviced != 0
    }
}

// ── ReportBuilder ─────────────────────────────────────────────────────────────

/// A single coerced field value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Address(IpAddr),
    Text(String),
    Time(i64),
    Count(u32),
}

/// Accumulates the fields of one in-progress [`Report`].
///
/// Every parser funnels raw values through here, so coercion rules are the
/// same regardless of source format.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    slots: [Option<FieldValue>; 8],
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce `raw` according to the kind of `field` and store it.
    ///
    /// Surrounding whitespace is ignored. Empty values, non-numeric or
    /// negative counts, malformed time text and invalid addresses are all
    /// rejected.
    pub fn set_text(&mut self, field: ReportField, raw: &str, codec: &TimeCodec) -> Result<()> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ReportError::invalid_field(field, "empty value"));
        }

        let value = match field.kind() {
            FieldKind::Address => FieldValue::Address(parse_address(raw)?),
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Time => FieldValue::Time(codec.decode(raw)?),
            FieldKind::Count => FieldValue::Count(parse_count(field, raw)?),
        };
        self.store(field, value)
    }

    /// Store an already-numeric epoch value, bypassing text decoding.
    pub fn set_request_time(&mut self, epoch_millis: i64) -> Result<()> {
        self.store(ReportField::RequestTime, FieldValue::Time(epoch_millis))
    }

    /// Store an already-numeric count.
    pub fn set_count(&mut self, field: ReportField, count: u32) -> Result<()> {
        if field.kind() != FieldKind::Count {
            return Err(ReportError::invalid_field(field, "not a count field"));
        }
        self.store(field, FieldValue::Count(count))
    }

    /// Finish the record. Fails when any field is still unset.
    pub fn build(self) -> Result<Report> {
        use FieldValue::{Address, Count, Text, Time};

        match self.slots {
            [Some(Address(client_address)), Some(Text(client_guid)), Some(Time(request_time)), Some(Text(service_guid)), Some(Count(retries_request)), Some(Count(packets_requested)), Some(Count(packets_serviced)), Some(Count(max_hole_size))] => {
                Ok(Report {
                    client_address,
                    client_guid,
                    request_time,
                    service_guid,
                    retries_request,
                    packets_requested,
                    packets_serviced,
                    max_hole_size,
                })
            }
            slots => {
                // `store` only ever puts a value of the field's own kind in a
                // slot, so the only way to land here is an empty slot.
                let missing: Vec<&str> = ReportField::ALL
                    .iter()
                    .zip(slots.iter())
                    .filter(|(_, slot)| slot.is_none())
                    .map(|(field, _)| field.key())
                    .collect();
                Err(ReportError::IncompleteReport(missing.join(", ")))
            }
        }
    }

    fn store(&mut self, field: ReportField, value: FieldValue) -> Result<()> {
        let slot = &mut self.slots[field.index()];
        if slot.is_some() {
            return Err(ReportError::invalid_field(field, "appears more than once"));
        }
        *slot = Some(value);
        Ok(())
    }
}

// ── Coercion helpers ──────────────────────────────────────────────────────────

/// Validate a client address as an IPv4 or IPv6 literal.
pub fn parse_address(raw: &str) -> Result<IpAddr> {
    raw.parse::<IpAddr>()
        .map_err(|source| ReportError::UnresolvableAddress {
            address: raw.to_string(),
            format: None,
            location: None,
            source,
        })
}

fn parse_count(field: ReportField, raw: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|e| ReportError::invalid_field(field, format!("\"{raw}\" is not a count ({e})")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
