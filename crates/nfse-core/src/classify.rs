//! Keyword-based template classification.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::record::InvoiceRecord;

/// One category and the keywords that must all appear in the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category identifier, also the template directory name.
    pub category: String,
    /// Required keywords, matched case-insensitively as substrings.
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(category: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the rule against an already uppercased description.
    fn matches(&self, description_upper: &str) -> bool {
        self.keywords
            .iter()
            .all(|keyword| description_upper.contains(&keyword.to_uppercase()))
    }
}

/// Ordered list of category rules. Earlier rules take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Built-in rules for the Maracanaú client.
    pub fn maracanau() -> Self {
        Self::new(vec![
            CategoryRule::new("MARACANAU_SEFIN", ["FINANÇAS", "PAPEL"]),
            CategoryRule::new("MARACANAU_EDUCACAO", ["EDUCAÇÃO", "PAPEL"]),
            CategoryRule::new("MARACANAU_SAUDE", ["SAÚDE", "PAPEL"]),
            CategoryRule::new("MARACANAU_SASC", ["CIDADANIA", "PAPEL"]),
            CategoryRule::new("MARACANAU_ARQUIVO", ["ARQUIVÍSTICO", "LAPSO"]),
        ])
    }

    /// Built-in rules for the Pacatuba client.
    pub fn pacatuba() -> Self {
        Self::new(vec![
            CategoryRule::new("PACATUBA_ADM", ["PACATUBA", "ADMINISTRAÇÃO"]),
            CategoryRule::new("PACATUBA_EDUCACAO", ["PACATUBA", "EDUCAÇÃO"]),
            CategoryRule::new("PACATUBA_INFRA", ["PACATUBA", "INFRAESTRUTURA"]),
            CategoryRule::new("PACATUBA_IPMP", ["PACATUBA", "SERVIDORES"]),
            CategoryRule::new("PACATUBA_FMAS", ["PACATUBA", "HUMANOS"]),
            CategoryRule::new("PACATUBA_SAUDE", ["PACATUBA", "SAÚDE"]),
        ])
    }

    /// Find the first rule whose keywords all occur in the description.
    pub fn classify_description(&self, description: &str) -> Option<&str> {
        let upper = description.to_uppercase();
        let found = self
            .rules
            .iter()
            .find(|rule| rule.matches(&upper))
            .map(|rule| rule.category.as_str());

        debug!("Classified description ({} chars) as {:?}", description.len(), found);
        found
    }
}

/// Classify a record against a rule table. First match wins.
pub fn classify<'a>(record: &InvoiceRecord, table: &'a RuleTable) -> Option<&'a str> {
    table.classify_description(&record.service_description)
}
