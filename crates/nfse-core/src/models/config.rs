//! Configuration structures for the report pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{CategoryRule, RuleTable};
use crate::error::{ConfigError, NfseError};

/// Main configuration for the nfse pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NfseConfig {
    /// Template library configuration.
    pub templates: TemplateConfig,

    /// Client organizations and their category rules, in lookup order.
    pub clients: Vec<ClientConfig>,

    /// Output configuration.
    pub output: OutputConfig,
}

impl Default for NfseConfig {
    fn default() -> Self {
        Self {
            templates: TemplateConfig::default(),
            clients: vec![
                ClientConfig::new("MARACANAU", RuleTable::maracanau()),
                ClientConfig::new("PACATUBA", RuleTable::pacatuba()),
            ],
            output: OutputConfig::default(),
        }
    }
}

/// Template library location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory holding one sub-directory per client
    /// (`<base_dir>/<CLIENT>/<CATEGORY>/<template>`).
    pub base_dir: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }
}

/// A client organization with its own rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client name; compared case-insensitively.
    pub name: String,

    /// Ordered category rules.
    pub categories: RuleTable,
}

impl ClientConfig {
    pub fn new(name: impl Into<String>, categories: RuleTable) -> Self {
        Self {
            name: name.into(),
            categories,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Archive file name prefix; the lowercased client name is appended.
    pub archive_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_prefix: "documentos".to_string(),
        }
    }
}

impl NfseConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, NfseError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), NfseError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that every rule table is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for client in &self.clients {
            if !seen.insert(client.name.to_uppercase()) {
                return Err(ConfigError::DuplicateClient(client.name.clone()));
            }
            for rule in client.categories.rules() {
                validate_rule(&client.name, rule)?;
            }
        }
        Ok(())
    }

    /// Find the configuration of a client by name.
    pub fn client(&self, name: &str) -> Option<&ClientConfig> {
        let wanted = name.trim().to_uppercase();
        self.clients
            .iter()
            .find(|c| c.name.to_uppercase() == wanted)
    }

    /// Rule table for a client.
    pub fn rule_table(&self, client: &str) -> Option<&RuleTable> {
        self.client(client).map(|c| &c.categories)
    }

    /// Directory holding the category template folders of a client.
    pub fn client_template_dir(&self, client: &str) -> PathBuf {
        self.templates.base_dir.join(client.trim().to_uppercase())
    }

    /// Default archive file name for a client, e.g. `documentos_maracanau.zip`.
    pub fn archive_name(&self, client: &str) -> String {
        format!(
            "{}_{}.zip",
            self.output.archive_prefix,
            client.trim().to_lowercase()
        )
    }
}

fn validate_rule(client: &str, rule: &CategoryRule) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRule {
        client: client.to_string(),
        reason,
    };

    if rule.category.trim().is_empty() {
        return Err(invalid("empty category identifier".to_string()));
    }
    if rule.keywords.is_empty() {
        return Err(invalid(format!("category {} has no keywords", rule.category)));
    }
    if rule.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(invalid(format!("category {} has a blank keyword", rule.category)));
    }
    Ok(())
}
