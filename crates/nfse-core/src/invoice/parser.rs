//! NFS-e XML parser producing normalized invoice records.

use std::time::Instant;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::record::{InvoiceRecord, SENTINEL};

use super::rules::{
    amount_in_words, extract_quantity, format_brl, format_competency, format_long_date,
    parse_amount, parse_iso_date,
};
use super::{InvoiceParser, Result};

/// Element holding the invoice fields.
pub const CONTAINER_TAG: &str = "InfNfse";

/// Leaf elements read from inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Number,
    IssueDate,
    Amount,
    Competency,
    Description,
}

impl Field {
    const COUNT: usize = 5;

    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"Numero" => Some(Self::Number),
            b"DataEmissao" => Some(Self::IssueDate),
            b"ValorServicos" => Some(Self::Amount),
            b"Competencia" => Some(Self::Competency),
            b"Discriminacao" => Some(Self::Description),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Raw text of the container's fields, before normalization.
#[derive(Debug, Default)]
struct RawFields {
    values: [Option<String>; Field::COUNT],
}

impl RawFields {
    fn is_set(&self, field: Field) -> bool {
        self.values[field.index()].is_some()
    }

    fn set(&mut self, field: Field, value: String) {
        self.values[field.index()] = Some(value);
    }

    /// Value of a field, `None` when absent or blank.
    fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()]
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }
}

/// Field currently being captured.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
    /// Only text before the first child element belongs to the field.
    closed: bool,
}

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Normalized record.
    pub record: InvoiceRecord,
    /// Fields that were present but could not be parsed.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Parser for NFS-e XML exports.
#[derive(Debug, Clone, Default)]
pub struct NfseParser;

impl NfseParser {
    pub fn new() -> Self {
        Self
    }

    /// Read the first container element and its raw leaf values.
    fn read_fields(&self, xml: &[u8]) -> Result<RawFields> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| ExtractionError::MalformedXml(format!("invalid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = Reader::from_str(text);
        let mut fields = RawFields::default();

        let mut depth = 0usize;
        let mut seen_root = false;
        let mut found = false;
        let mut container_depth: Option<usize> = None;
        let mut capture: Option<Capture> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                ExtractionError::MalformedXml(format!(
                    "{} at position {}",
                    e,
                    reader.error_position()
                ))
            })?;

            match event {
                Event::Start(e) => {
                    if depth == 0 && seen_root {
                        return Err(ExtractionError::MalformedXml(
                            "multiple root elements".to_string(),
                        ));
                    }
                    depth += 1;
                    seen_root = true;

                    if let Some(c) = capture.as_mut() {
                        c.closed = true;
                    } else if container_depth.is_some() {
                        if let Some(field) = wanted_field(&e, &fields) {
                            capture = Some(Capture {
                                field,
                                depth,
                                text: String::new(),
                                closed: false,
                            });
                        }
                    } else if !found && is_container(&e) {
                        found = true;
                        container_depth = Some(depth);
                    }
                }
                Event::Empty(e) => {
                    if depth == 0 && seen_root {
                        return Err(ExtractionError::MalformedXml(
                            "multiple root elements".to_string(),
                        ));
                    }
                    seen_root = true;

                    if let Some(c) = capture.as_mut() {
                        c.closed = true;
                    } else if container_depth.is_some() {
                        // An empty leaf still shadows later elements of the same name.
                        if let Some(field) = wanted_field(&e, &fields) {
                            fields.set(field, String::new());
                        }
                    } else if !found && is_container(&e) {
                        found = true;
                    }
                }
                Event::Text(t) => {
                    if let Some(c) = capture.as_mut().filter(|c| !c.closed) {
                        let unescaped = t
                            .unescape()
                            .map_err(|e| ExtractionError::MalformedXml(e.to_string()))?;
                        c.text.push_str(&unescaped);
                    }
                }
                Event::CData(t) => {
                    if let Some(c) = capture.as_mut().filter(|c| !c.closed) {
                        c.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
                Event::End(_) => {
                    if capture.as_ref().is_some_and(|c| c.depth == depth) {
                        if let Some(c) = capture.take() {
                            debug!("Read {:?} ({} chars)", c.field, c.text.len());
                            fields.set(c.field, c.text);
                        }
                    }
                    if container_depth == Some(depth) {
                        container_depth = None;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if depth != 0 {
            return Err(ExtractionError::MalformedXml(
                "unexpected end of document".to_string(),
            ));
        }
        if !seen_root {
            return Err(ExtractionError::MalformedXml("no root element".to_string()));
        }
        if !found {
            return Err(ExtractionError::MissingSection(CONTAINER_TAG.to_string()));
        }

        Ok(fields)
    }

    /// Turn raw leaf values into a formatted record.
    fn normalize(&self, fields: &RawFields, warnings: &mut Vec<String>) -> Result<InvoiceRecord> {
        let mut record = InvoiceRecord::default();

        if let Some(number) = fields.get(Field::Number) {
            record.invoice_number = number.trim().to_string();
        }

        if let Some(raw) = fields.get(Field::IssueDate) {
            match parse_iso_date(raw) {
                Some(date) => record.issue_date = format_long_date(date),
                None => {
                    warn!("Invalid issue date {:?}, using {}", raw, SENTINEL);
                    warnings.push(format!("invalid issue date: {}", raw.trim()));
                }
            }
        }

        if let Some(raw) = fields.get(Field::Competency) {
            match parse_iso_date(raw) {
                Some(date) => record.competency_period = format_competency(date),
                None => {
                    warn!("Invalid competency {:?}, using {}", raw, SENTINEL);
                    warnings.push(format!("invalid competency: {}", raw.trim()));
                }
            }
        }

        if let Some(raw) = fields.get(Field::Amount) {
            let amount = parse_amount(raw)
                .ok_or_else(|| ExtractionError::InvalidAmount(raw.trim().to_string()))?;
            if amount.is_zero() {
                // A zero amount is treated as not filled in.
                debug!("Zero amount, using {}", SENTINEL);
            } else {
                let words = amount_in_words(amount)
                    .ok_or_else(|| ExtractionError::InvalidAmount(raw.trim().to_string()))?;
                record.gross_amount = format_brl(amount);
                record.amount_in_words = words;
            }
        }

        if let Some(description) = fields.values[Field::Description.index()].as_deref() {
            record.service_description = description.to_string();
        }

        if let Some(quantity) = extract_quantity(&record.service_description) {
            record.quantity = quantity.to_string();
        }

        Ok(record)
    }
}

fn is_container(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == CONTAINER_TAG.as_bytes()
}

/// Field for a leaf element, unless that field was already read.
fn wanted_field(e: &BytesStart<'_>, fields: &RawFields) -> Option<Field> {
    Field::from_tag(e.local_name().as_ref()).filter(|f| !fields.is_set(*f))
}

impl InvoiceParser for NfseParser {
    fn parse(&self, xml: &[u8]) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let fields = self.read_fields(xml)?;
        let record = self.normalize(&fields, &mut warnings)?;

        info!(
            "Extracted invoice {} ({})",
            record.invoice_number, record.gross_amount
        );

        Ok(ExtractionResult {
            record,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
