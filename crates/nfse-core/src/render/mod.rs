//! Template resolution and document rendering.

mod docx;
mod provider;

pub use docx::DocxRenderer;
pub use provider::{DirTemplateProvider, MemoryTemplateProvider};

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::RenderError;
use crate::models::record::{GeneratedDocument, InvoiceRecord, TemplateRole};

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Source of template files, scoped by category.
pub trait TemplateProvider {
    /// Load the template of a role for a category, `None` when it does not exist.
    fn resolve(&self, category: &str, role: TemplateRole) -> std::io::Result<Option<Vec<u8>>>;
}

/// Engine that fills template placeholders.
pub trait TemplateRenderer {
    /// Render a template with a field name to value mapping.
    fn render(&self, template: &[u8], context: &BTreeMap<&'static str, String>) -> Result<Vec<u8>>;
}

/// Why a single role produced no document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSkip {
    /// No template for this role in the category.
    NotFound(TemplateRole),
    /// The template exists but could not be loaded or rendered.
    Failed { role: TemplateRole, reason: String },
}

/// Documents rendered for one invoice, and the roles that were skipped.
#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    pub documents: Vec<GeneratedDocument>,
    pub skipped: Vec<RoleSkip>,
}

/// Render every template role of a category for one record.
///
/// Roles are rendered in [`TemplateRole::ALL`] order. A missing or broken
/// template skips that role only.
pub fn render_all(
    record: &InvoiceRecord,
    category: &str,
    templates: &dyn TemplateProvider,
    renderer: &dyn TemplateRenderer,
    input_name: &str,
) -> RenderOutcome {
    let mut outcome = RenderOutcome::default();
    let context = record.context();

    for role in TemplateRole::ALL {
        let template = match templates.resolve(category, role) {
            Ok(Some(template)) => template,
            Ok(None) => {
                warn!("Template {}/{} not found, skipping", category, role);
                outcome.skipped.push(RoleSkip::NotFound(role));
                continue;
            }
            Err(e) => {
                warn!("Failed to load template {}/{}: {}", category, role, e);
                outcome.skipped.push(RoleSkip::Failed {
                    role,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match renderer.render(&template, &context) {
            Ok(bytes) => {
                let name = role.output_name(input_name);
                debug!("Rendered {} ({} bytes)", name, bytes.len());
                outcome.documents.push(GeneratedDocument::new(name, bytes));
            }
            Err(e) => {
                warn!("Failed to render {}/{}: {}", category, role, e);
                outcome.skipped.push(RoleSkip::Failed {
                    role,
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome
}
