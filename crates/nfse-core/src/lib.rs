//! Core library for NFS-e report generation.
//!
//! This crate provides:
//! - NFS-e XML field extraction (amounts, spelled-out values, Portuguese dates)
//! - Keyword-based template classification
//! - DOCX template rendering and batch aggregation
//! - ZIP packaging of the generated documents

pub mod archive;
pub mod batch;
pub mod classify;
pub mod error;
pub mod invoice;
pub mod models;
pub mod render;

pub use archive::{Archiver, ZipArchiver};
pub use batch::{
    BatchProcessor, BatchReport, DocumentReport, DocumentStatus, InputDocument, PackageOutcome,
    SkipReason,
};
pub use classify::{CategoryRule, RuleTable, classify};
pub use error::{NfseError, Result};
pub use invoice::{ExtractionResult, InvoiceParser, NfseParser};
pub use models::config::NfseConfig;
pub use models::record::{GeneratedDocument, InvoiceRecord, SENTINEL, TemplateRole};
pub use render::{
    DirTemplateProvider, DocxRenderer, MemoryTemplateProvider, RenderOutcome, RoleSkip,
    TemplateProvider, TemplateRenderer, render_all,
};
