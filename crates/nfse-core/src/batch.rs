//! Batch driver: extract, classify and render every input document.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{self, Archiver};
use crate::classify::{RuleTable, classify};
use crate::error::ExtractionError;
use crate::invoice::{InvoiceParser, NfseParser};
use crate::models::record::{GeneratedDocument, TemplateRole};
use crate::render::{RoleSkip, TemplateProvider, TemplateRenderer, render_all};

/// One input file of a batch.
#[derive(Debug, Clone)]
pub struct InputDocument {
    /// File name, used to name the outputs.
    pub name: String,
    /// Raw XML bytes.
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Why a document, or one of its templates, produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The input is not well-formed XML.
    MalformedXml { detail: String },
    /// The input has no invoice section.
    MissingRequiredSection,
    /// The gross amount could not be read.
    InvalidAmount { value: String },
    /// No category rule matched the description.
    NoCategoryMatch,
    /// The category has no template for a role.
    TemplateNotFound { role: TemplateRole },
    /// A template could not be loaded or rendered.
    RenderFailed { role: TemplateRole, detail: String },
}

impl SkipReason {
    /// Whether the input itself is broken, as opposed to simply not applicable.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedXml { .. } | Self::InvalidAmount { .. } | Self::RenderFailed { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedXml { detail } => write!(f, "malformed XML: {}", detail),
            Self::MissingRequiredSection => write!(f, "no invoice section"),
            Self::InvalidAmount { value } => write!(f, "invalid amount {:?}", value),
            Self::NoCategoryMatch => write!(f, "no matching category"),
            Self::TemplateNotFound { role } => write!(f, "template {} not found", role),
            Self::RenderFailed { role, detail } => {
                write!(f, "failed to render {}: {}", role, detail)
            }
        }
    }
}

impl From<ExtractionError> for SkipReason {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::MalformedXml(detail) => Self::MalformedXml { detail },
            ExtractionError::MissingSection(_) => Self::MissingRequiredSection,
            ExtractionError::InvalidAmount(value) => Self::InvalidAmount { value },
        }
    }
}

impl From<RoleSkip> for SkipReason {
    fn from(skip: RoleSkip) -> Self {
        match skip {
            RoleSkip::NotFound(role) => Self::TemplateNotFound { role },
            RoleSkip::Failed { role, reason } => Self::RenderFailed {
                role,
                detail: reason,
            },
        }
    }
}

/// Outcome of one input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Classified and rendered; `outputs` may be empty when every template was skipped.
    Rendered {
        category: String,
        outputs: Vec<String>,
    },
    /// Contributed nothing to the batch.
    Skipped { reason: SkipReason },
}

/// Per-document entry of a batch report.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Input file name.
    pub name: String,
    /// What happened to the document.
    pub status: DocumentStatus,
    /// Template roles that produced no document.
    pub role_skips: Vec<SkipReason>,
    /// Fields that degraded to their sentinel.
    pub warnings: Vec<String>,
}

impl DocumentReport {
    fn skipped(name: &str, reason: SkipReason, warnings: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            status: DocumentStatus::Skipped { reason },
            role_skips: Vec::new(),
            warnings,
        }
    }

    /// Matched category, if the document was classified.
    pub fn category(&self) -> Option<&str> {
        match &self.status {
            DocumentStatus::Rendered { category, .. } => Some(category),
            DocumentStatus::Skipped { .. } => None,
        }
    }
}

/// Result of packaging a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Archive bytes holding every generated document.
    Bundle(Vec<u8>),
    /// The batch generated no documents; no archive was built.
    NothingProcessed,
}

/// Aggregated output of a batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Generated documents across all inputs.
    pub documents: Vec<GeneratedDocument>,
    /// One entry per input document.
    pub reports: Vec<DocumentReport>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
    names: HashSet<String>,
}

impl BatchReport {
    /// Append the outcome of one document.
    ///
    /// Output names are kept unique across the batch: a name already taken
    /// by an earlier input gets a numeric suffix, and the rename is recorded
    /// as a warning on the report.
    pub fn push(&mut self, mut report: DocumentReport, documents: Vec<GeneratedDocument>) {
        for mut document in documents {
            if self.names.contains(&document.name) {
                let unique = self.unique_name(&document.name);
                warn!("Output {} already exists, renaming to {}", document.name, unique);

                if let DocumentStatus::Rendered { outputs, .. } = &mut report.status {
                    if let Some(output) = outputs.iter_mut().find(|o| **o == document.name) {
                        *output = unique.clone();
                    }
                }
                report
                    .warnings
                    .push(format!("output {} renamed to {}", document.name, unique));
                document.name = unique;
            }
            self.names.insert(document.name.clone());
            self.documents.push(document);
        }
        self.reports.push(report);
    }

    /// First free `<stem>_<n><ext>` variant of a taken name.
    fn unique_name(&self, name: &str) -> String {
        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name, ""),
        };
        (2u32..)
            .map(|n| format!("{}_{}{}", stem, n, ext))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    /// Whether no document was generated.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Every skip in the batch, document level and role level, with its input name.
    pub fn skips(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.reports.iter().flat_map(|r| {
            let document = match &r.status {
                DocumentStatus::Skipped { reason } => Some((r.name.as_str(), reason)),
                DocumentStatus::Rendered { .. } => None,
            };
            document
                .into_iter()
                .chain(r.role_skips.iter().map(move |s| (r.name.as_str(), s)))
        })
    }

    /// Bundle the generated documents.
    ///
    /// An empty batch yields [`PackageOutcome::NothingProcessed`]; only a
    /// failure of the archiver itself is an error.
    pub fn package(&self, archiver: &dyn Archiver) -> archive::Result<PackageOutcome> {
        if self.is_empty() {
            warn!("Batch generated no documents");
            return Ok(PackageOutcome::NothingProcessed);
        }
        let bytes = archiver.archive(&self.documents)?;
        info!(
            "Packaged {} documents ({} bytes)",
            self.documents.len(),
            bytes.len()
        );
        Ok(PackageOutcome::Bundle(bytes))
    }
}

/// Runs extraction, classification and rendering over a batch.
pub struct BatchProcessor<'a> {
    parser: Box<dyn InvoiceParser + 'a>,
    rules: &'a RuleTable,
    templates: &'a dyn TemplateProvider,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> BatchProcessor<'a> {
    /// Create a processor using the NFS-e parser.
    pub fn new(
        rules: &'a RuleTable,
        templates: &'a dyn TemplateProvider,
        renderer: &'a dyn TemplateRenderer,
    ) -> Self {
        Self {
            parser: Box::new(NfseParser::new()),
            rules,
            templates,
            renderer,
        }
    }

    /// Use another parser.
    pub fn with_parser(mut self, parser: impl InvoiceParser + 'a) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Process one document. Failures are reported, never propagated.
    pub fn process_document(
        &self,
        input: &InputDocument,
    ) -> (DocumentReport, Vec<GeneratedDocument>) {
        debug!("Processing {} ({} bytes)", input.name, input.bytes.len());

        let extraction = match self.parser.parse(&input.bytes) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Skipping {}: {}", input.name, e);
                return (
                    DocumentReport::skipped(&input.name, e.into(), Vec::new()),
                    Vec::new(),
                );
            }
        };

        let Some(category) = classify(&extraction.record, self.rules) else {
            warn!("No matching category for {}, skipping", input.name);
            return (
                DocumentReport::skipped(
                    &input.name,
                    SkipReason::NoCategoryMatch,
                    extraction.warnings,
                ),
                Vec::new(),
            );
        };

        let outcome = render_all(
            &extraction.record,
            category,
            self.templates,
            self.renderer,
            &input.name,
        );

        info!(
            "{} -> {} ({} documents)",
            input.name,
            category,
            outcome.documents.len()
        );

        let report = DocumentReport {
            name: input.name.clone(),
            status: DocumentStatus::Rendered {
                category: category.to_string(),
                outputs: outcome.documents.iter().map(|d| d.name.clone()).collect(),
            },
            role_skips: outcome.skipped.into_iter().map(SkipReason::from).collect(),
            warnings: extraction.warnings,
        };

        (report, outcome.documents)
    }

    /// Process every document in order.
    pub fn process<I>(&self, inputs: I) -> BatchReport
    where
        I: IntoIterator<Item = InputDocument>,
    {
        let start = Instant::now();
        let mut batch = BatchReport::default();

        for input in inputs {
            let (report, documents) = self.process_document(&input);
            batch.push(report, documents);
        }

        batch.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Processed {} inputs, generated {} documents",
            batch.reports.len(),
            batch.documents.len()
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipArchiver;
    use crate::error::ArchiveError;
    use crate::render::MemoryTemplateProvider;
    use crate::render::testing::EchoRenderer;
    use pretty_assertions::assert_eq;

    fn invoice_xml(number: &str, description: &str) -> Vec<u8> {
        format!(
            "<CompNfse><Nfse><InfNfse>\
             <Numero>{}</Numero>\
             <DataEmissao>2024-03-05</DataEmissao>\
             <Competencia>2024-03-01</Competencia>\
             <ValorServicos>1234.56</ValorServicos>\
             <Discriminacao>{}</Discriminacao>\
             </InfNfse></Nfse></CompNfse>",
            number, description
        )
        .into_bytes()
    }

    fn all_templates() -> MemoryTemplateProvider {
        let mut templates = MemoryTemplateProvider::new();
        for category in ["MARACANAU_EDUCACAO", "MARACANAU_SAUDE"] {
            for role in TemplateRole::ALL {
                templates.insert(category, role, role.file_name().as_bytes().to_vec());
            }
        }
        templates
    }

    fn names(batch: &BatchReport) -> Vec<&str> {
        batch.documents.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![
            InputDocument::new("b.xml", invoice_xml("2", "SAÚDE - PAPEL")),
            InputDocument::new("a.xml", invoice_xml("1", "SERVIÇOS DE EDUCAÇÃO EM PAPEL")),
        ]);

        assert_eq!(
            names(&batch),
            vec![
                "b_Planilha.docx",
                "b_Relatorio.docx",
                "a_Planilha.docx",
                "a_Relatorio.docx",
            ]
        );
        assert_eq!(batch.reports[0].category(), Some("MARACANAU_SAUDE"));
        assert_eq!(batch.reports[1].category(), Some("MARACANAU_EDUCACAO"));
        assert_eq!(batch.skips().count(), 0);

        let body = String::from_utf8(batch.documents[2].bytes.clone()).unwrap();
        assert!(body.contains("numeroNF=1"));
        assert!(body.contains("data=5 de Março de 2024"));
        assert!(body.contains("valor=R$ 1.234,56"));
    }

    #[test]
    fn test_failures_are_isolated() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![
            InputDocument::new("sem_secao.xml", b"<Nfse><Numero>1</Numero></Nfse>".to_vec()),
            InputDocument::new("quebrado.xml", b"<InfNfse><Numero>".to_vec()),
            InputDocument::new("outra.xml", invoice_xml("3", "Consultoria em PAPEL")),
            InputDocument::new("ok.xml", invoice_xml("4", "EDUCAÇÃO / PAPEL")),
        ]);

        assert_eq!(names(&batch), vec!["ok_Planilha.docx", "ok_Relatorio.docx"]);

        let skips: Vec<(&str, &SkipReason)> = batch.skips().collect();
        assert_eq!(skips.len(), 3);
        assert_eq!(skips[0], ("sem_secao.xml", &SkipReason::MissingRequiredSection));
        assert!(matches!(skips[1], ("quebrado.xml", SkipReason::MalformedXml { .. })));
        assert_eq!(skips[2], ("outra.xml", &SkipReason::NoCategoryMatch));
        assert!(skips[1].1.is_failure());
        assert!(!skips[2].1.is_failure());
    }

    #[test]
    fn test_only_report_template() {
        let rules = RuleTable::maracanau();
        let templates = MemoryTemplateProvider::new().with(
            "MARACANAU_EDUCACAO",
            TemplateRole::Report,
            b"relatorio".to_vec(),
        );
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![InputDocument::new(
            "nota.xml",
            invoice_xml("5", "SERVIÇOS DE EDUCAÇÃO EM PAPEL"),
        )]);

        assert_eq!(names(&batch), vec!["nota_Relatorio.docx"]);
        assert_eq!(
            batch.reports[0].role_skips,
            vec![SkipReason::TemplateNotFound {
                role: TemplateRole::Summary
            }]
        );
        assert_eq!(
            batch.skips().collect::<Vec<_>>(),
            vec![(
                "nota.xml",
                &SkipReason::TemplateNotFound {
                    role: TemplateRole::Summary
                }
            )]
        );
    }

    #[test]
    fn test_warnings_are_reported() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let xml = "<InfNfse><DataEmissao>05/03/2024</DataEmissao>\
                   <Discriminacao>EDUCAÇÃO PAPEL</Discriminacao></InfNfse>";
        let (report, documents) =
            processor.process_document(&InputDocument::new("n.xml", xml.as_bytes().to_vec()));

        assert_eq!(documents.len(), 2);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_package_empty_batch() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![InputDocument::new(
            "x.xml",
            invoice_xml("1", "nada"),
        )]);

        assert!(batch.is_empty());
        assert_eq!(
            batch.package(&ZipArchiver::new()).unwrap(),
            PackageOutcome::NothingProcessed
        );
    }

    #[test]
    fn test_package_bundle() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![InputDocument::new(
            "x.xml",
            invoice_xml("1", "EDUCAÇÃO PAPEL"),
        )]);

        match batch.package(&ZipArchiver::new()).unwrap() {
            PackageOutcome::Bundle(bytes) => assert!(bytes.starts_with(b"PK")),
            PackageOutcome::NothingProcessed => panic!("expected a bundle"),
        }
    }

    #[test]
    fn test_colliding_output_names_are_renamed() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![
            InputDocument::new("nota.xml", invoice_xml("1", "EDUCAÇÃO PAPEL")),
            InputDocument::new("nota.xml", invoice_xml("2", "SAÚDE PAPEL")),
        ]);

        assert_eq!(
            names(&batch),
            vec![
                "nota_Planilha.docx",
                "nota_Relatorio.docx",
                "nota_Planilha_2.docx",
                "nota_Relatorio_2.docx",
            ]
        );
        assert_eq!(
            batch.reports[1].status,
            DocumentStatus::Rendered {
                category: "MARACANAU_SAUDE".to_string(),
                outputs: vec![
                    "nota_Planilha_2.docx".to_string(),
                    "nota_Relatorio_2.docx".to_string(),
                ],
            }
        );
        assert_eq!(batch.reports[1].warnings.len(), 2);
        assert!(batch.reports[0].warnings.is_empty());

        let bytes = match batch.package(&ZipArchiver::new()).unwrap() {
            PackageOutcome::Bundle(bytes) => bytes,
            PackageOutcome::NothingProcessed => panic!("expected a bundle"),
        };
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), batch.documents.len());
    }

    struct FailingArchiver;

    impl Archiver for FailingArchiver {
        fn archive(&self, _documents: &[GeneratedDocument]) -> archive::Result<Vec<u8>> {
            Err(ArchiveError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_archiver_failure_is_an_error() {
        let rules = RuleTable::maracanau();
        let templates = all_templates();
        let processor = BatchProcessor::new(&rules, &templates, &EchoRenderer);

        let batch = processor.process(vec![InputDocument::new(
            "x.xml",
            invoice_xml("1", "EDUCAÇÃO PAPEL"),
        )]);

        assert!(batch.package(&FailingArchiver).is_err());
    }
}
