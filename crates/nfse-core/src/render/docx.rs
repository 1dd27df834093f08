//! DOCX template renderer.
//!
//! A DOCX file is a ZIP container of XML parts. Placeholders written as
//! `{{ name }}` in the body, headers and footers are replaced with the
//! XML-escaped field value; every other part is copied as is.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use lazy_static::lazy_static;
use quick_xml::escape::escape;
use regex::{Captures, Regex};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{Result, TemplateRenderer};
use crate::error::RenderError;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(
        r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}"
    ).unwrap();
}

const DOCUMENT_PART: &str = "word/document.xml";

/// Renderer for Word templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Parts that may carry placeholders.
fn is_content_part(name: &str) -> bool {
    name == DOCUMENT_PART
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

impl TemplateRenderer for DocxRenderer {
    fn render(&self, template: &[u8], context: &BTreeMap<&'static str, String>) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(template))
            .map_err(|e| RenderError::InvalidTemplate(format!("not a DOCX document: {}", e)))?;

        if !archive.file_names().any(|n| n == DOCUMENT_PART) {
            return Err(RenderError::InvalidTemplate(format!(
                "missing {}",
                DOCUMENT_PART
            )));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if entry.is_dir() {
                writer.add_directory(name, options)?;
                continue;
            }

            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;

            if is_content_part(&name) {
                let xml = String::from_utf8(content).map_err(|_| {
                    RenderError::InvalidTemplate(format!("{} is not UTF-8", name))
                })?;
                content = fill_placeholders(&xml, context).into_bytes();
                debug!("Filled placeholders in {}", name);
            }

            writer.start_file(name, options)?;
            writer.write_all(&content)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Replace every `{{ name }}` in a part. Unknown names render empty.
fn fill_placeholders(xml: &str, context: &BTreeMap<&'static str, String>) -> String {
    let merged = merge_split_placeholders(xml);
    PLACEHOLDER
        .replace_all(&merged, |caps: &Captures<'_>| {
            context
                .get(&caps[1])
                .map(|value| escape(value.as_str()).into_owned())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Word often splits `{{ name }}` over several runs. Drop the markup between
/// an opening `{{` and its closing `}}` so the placeholder is contiguous text.
fn merge_split_placeholders(xml: &str) -> Cow<'_, str> {
    if !xml.contains("{{") {
        return Cow::Borrowed(xml);
    }

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match collapse_placeholder(tail) {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &tail[consumed..];
            }
            None => {
                out.push_str("{{");
                rest = &tail[2..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Text of the placeholder at the start of `tail` without markup, and the
/// number of bytes it spans.
///
/// `None` when the braces do not enclose a placeholder: text other than an
/// identifier and whitespace comes before `}}`, a paragraph starts or ends
/// first, or the part ends.
fn collapse_placeholder(tail: &str) -> Option<(String, usize)> {
    let mut text = String::from("{{");
    let mut tag: Option<String> = None;
    let mut prev = '\0';

    for (i, c) in tail[2..].char_indices() {
        if let Some(name) = tag.as_mut() {
            if c == '>' {
                if is_paragraph_tag(name) {
                    return None;
                }
                tag = None;
            } else {
                name.push(c);
            }
            continue;
        }
        match c {
            '<' => tag = Some(String::new()),
            '}' if prev == '}' => {
                text.push(c);
                return Some((text, 2 + i + c.len_utf8()));
            }
            '}' => {
                text.push(c);
                prev = c;
            }
            _ if prev == '}' => return None,
            c if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() => {
                text.push(c);
                prev = c;
            }
            _ => return None,
        }
    }

    None
}

/// `<w:p ...>`, `</w:p>` or `<w:p/>`.
fn is_paragraph_tag(tag: &str) -> bool {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .is_some_and(|name| name == "w:p")
}
