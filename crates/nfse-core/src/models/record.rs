//! Invoice field record and generated document models.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Placeholder substituted for any field that could not be extracted.
pub const SENTINEL: &str = "N/A";

/// Normalized fields extracted from one NFS-e document.
///
/// Every field is already formatted for output. Fields missing from the
/// source hold [`SENTINEL`], except the description which is empty.
/// The serialized names are the placeholder names used by the template
/// library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Invoice number (`Numero`).
    #[serde(rename = "numeroNF")]
    pub invoice_number: String,

    /// Issue date, e.g. "5 de Março de 2024".
    #[serde(rename = "data")]
    pub issue_date: String,

    /// Gross amount in Brazilian style, e.g. "R$ 1.234,56".
    #[serde(rename = "valor")]
    pub gross_amount: String,

    /// Gross amount spelled out in Portuguese.
    #[serde(rename = "valor_extenso")]
    pub amount_in_words: String,

    /// Competency period, e.g. "Março 2024".
    #[serde(rename = "competencia")]
    pub competency_period: String,

    /// Raw service description (`Discriminacao`).
    #[serde(rename = "discriminacao")]
    pub service_description: String,

    /// Quantity found in the description.
    #[serde(rename = "quant")]
    pub quantity: String,
}

impl InvoiceRecord {
    /// Substitution mapping handed to the template renderer.
    pub fn context(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("numeroNF", self.invoice_number.clone()),
            ("data", self.issue_date.clone()),
            ("valor", self.gross_amount.clone()),
            ("valor_extenso", self.amount_in_words.clone()),
            ("competencia", self.competency_period.clone()),
            ("discriminacao", self.service_description.clone()),
            ("quant", self.quantity.clone()),
        ])
    }
}

impl Default for InvoiceRecord {
    fn default() -> Self {
        Self {
            invoice_number: SENTINEL.to_string(),
            issue_date: SENTINEL.to_string(),
            gross_amount: SENTINEL.to_string(),
            amount_in_words: SENTINEL.to_string(),
            competency_period: SENTINEL.to_string(),
            service_description: String::new(),
            quantity: SENTINEL.to_string(),
        }
    }
}

/// The two fixed templates rendered for every classified invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRole {
    /// Tabular summary (Planilha).
    Summary,
    /// Narrative report (Relatorio).
    Report,
}

impl TemplateRole {
    /// Roles in rendering order.
    pub const ALL: [TemplateRole; 2] = [TemplateRole::Summary, TemplateRole::Report];

    /// File name of the template in a category directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Summary => "Planilha.docx",
            Self::Report => "Relatorio.docx",
        }
    }

    /// Name of the document rendered from this role for an input file.
    pub fn output_name(&self, input_name: &str) -> String {
        let stem = Path::new(input_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(input_name);
        format!("{}_{}", stem, self.file_name())
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A rendered output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// Archive entry name.
    pub name: String,
    /// Rendered payload.
    pub bytes: Vec<u8>,
}

impl GeneratedDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}
