//! Packaging generated documents into a single ZIP archive.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::models::record::GeneratedDocument;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Trait for bundling generated documents.
pub trait Archiver {
    /// Bundle the documents, in order, into one archive.
    fn archive(&self, documents: &[GeneratedDocument]) -> Result<Vec<u8>>;
}

/// Deflate-compressed ZIP archiver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

impl Archiver for ZipArchiver {
    fn archive(&self, documents: &[GeneratedDocument]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut names = HashSet::new();

        for document in documents {
            if !names.insert(document.name.as_str()) {
                warn!("Duplicate document name {}, keeping the first", document.name);
                continue;
            }
            writer.start_file(document.name.as_str(), options)?;
            writer.write_all(&document.bytes)?;
            debug!("Archived {} ({} bytes)", document.name, document.bytes.len());
        }

        Ok(writer.finish()?.into_inner())
    }
}
