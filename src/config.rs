use std::{collections::HashMap, fs, path::Path, sync::Arc};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::CoreError;

/// Raw template document, deserialized as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDocument {
    pub config: AccountSection,
    #[serde(default)]
    pub templates: Vec<TemplateSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSection {
    pub default_account: String,
    #[serde(default)]
    pub accounts: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSection {
    pub command: CommandAliases,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub optional_args: Vec<String>,
    /// Computed fields evaluate in declaration order, hence the IndexMap.
    #[serde(default)]
    pub computed: IndexMap<String, String>,
    pub template: String,
}

/// A template accepts one alias or a list of aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandAliases {
    One(String),
    Many(Vec<String>),
}

impl CommandAliases {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(alias) => vec![alias],
            Self::Many(aliases) => aliases,
        }
    }
}

/// Validated, immutable template snapshot shared by dispatchers. A reload
/// builds a fresh snapshot and swaps it in; nothing mutates one in place.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub default_account: String,
    pub accounts: HashMap<String, String>,
    pub templates: Vec<Template>,
}

/// One command definition in declared order.
#[derive(Debug, Clone)]
pub struct Template {
    pub aliases: Vec<String>,
    pub args: Vec<String>,
    pub optional_args: Vec<String>,
    pub computed: IndexMap<String, String>,
    pub template: String,
}

impl TemplateConfig {
    /// Loads and validates a template document from a JSON file.
    pub fn load(path: &Path) -> Result<Arc<Self>, CoreError> {
        let data = fs::read_to_string(path)?;
        let document: TemplateDocument = serde_json::from_str(&data)?;
        Self::from_document(document).map(Arc::new)
    }

    pub fn from_document(document: TemplateDocument) -> Result<Self, CoreError> {
        if document.config.default_account.trim().is_empty() {
            return Err(CoreError::Config("default_account must not be empty".into()));
        }

        let mut templates = Vec::with_capacity(document.templates.len());
        for (index, section) in document.templates.into_iter().enumerate() {
            let aliases = section.command.into_vec();
            if aliases.is_empty() || aliases.iter().any(|alias| alias.trim().is_empty()) {
                return Err(CoreError::Config(format!(
                    "template #{index} needs at least one non-empty command alias"
                )));
            }
            if section.template.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "template #{index} has an empty template body"
                )));
            }
            templates.push(Template {
                aliases,
                args: section.args,
                optional_args: section.optional_args,
                computed: section.computed,
                template: section.template,
            });
        }

        Ok(Self {
            default_account: document.config.default_account,
            accounts: document.config.accounts,
            templates,
        })
    }
}
