//! NFS-e field extraction module.

mod parser;
pub mod rules;

pub use parser::{ExtractionResult, NfseParser, CONTAINER_TAG};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for invoice parsers.
pub trait InvoiceParser {
    /// Parse one invoice document.
    fn parse(&self, xml: &[u8]) -> Result<ExtractionResult>;
}
