//! Error types for the nfse-core library.

use thiserror::Error;

/// Main error type for the nfse library.
#[derive(Error, Debug)]
pub enum NfseError {
    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Template rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Archive packaging error.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to invoice field extraction.
///
/// Each of these is fatal for the document being extracted only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document could not be parsed as XML.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// The required container element is absent.
    #[error("missing required section <{0}>")]
    MissingSection(String),

    /// The gross amount is present but is not a decimal number.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
}

/// Errors related to template rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template is not a usable document.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Failed to read or write the document container.
    #[error("document container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while reading the template.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to archive packaging.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to write the archive.
    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while writing an entry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be decoded.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A rule table entry is unusable.
    #[error("invalid rule for client {client}: {reason}")]
    InvalidRule { client: String, reason: String },

    /// Two clients share the same name.
    #[error("duplicate client: {0}")]
    DuplicateClient(String),
}

/// Result type for the nfse library.
pub type Result<T> = std::result::Result<T, NfseError>;
