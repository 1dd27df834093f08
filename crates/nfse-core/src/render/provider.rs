//! Template providers backed by a directory tree or memory.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::TemplateProvider;
use crate::models::record::TemplateRole;

/// Templates laid out as `<root>/<CATEGORY>/<role file name>`.
#[derive(Debug, Clone)]
pub struct DirTemplateProvider {
    root: PathBuf,
}

impl DirTemplateProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the template of a role for a category.
    pub fn template_path(&self, category: &str, role: TemplateRole) -> PathBuf {
        self.root.join(category).join(role.file_name())
    }
}

impl TemplateProvider for DirTemplateProvider {
    fn resolve(&self, category: &str, role: TemplateRole) -> std::io::Result<Option<Vec<u8>>> {
        let path = self.template_path(category, role);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!("Loaded template {} ({} bytes)", path.display(), bytes.len());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateProvider {
    templates: HashMap<(String, TemplateRole), Vec<u8>>,
}

impl MemoryTemplateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, role: TemplateRole, template: Vec<u8>) {
        self.templates.insert((category.into(), role), template);
    }

    pub fn with(mut self, category: impl Into<String>, role: TemplateRole, template: Vec<u8>) -> Self {
        self.insert(category, role, template);
        self
    }
}

impl TemplateProvider for MemoryTemplateProvider {
    fn resolve(&self, category: &str, role: TemplateRole) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.templates.get(&(category.to_string(), role)).cloned())
    }
}
