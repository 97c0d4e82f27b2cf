use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;

use crate::config::{Template, TemplateConfig};
use crate::entry::Entry;
use crate::errors::CoreError;
use crate::grammar::Grammar;
use crate::tokenizer::Tokenizer;

use super::{expr, Dispatcher};

/// Dispatcher that synthesizes ledger entries from configured templates.
///
/// The first token of the input selects a template by alias; the remaining
/// tokens bind positionally to the template's arguments. A trailing
/// `> alias` segment redirects the default account.
pub struct TemplateDispatcher {
    config: Arc<TemplateConfig>,
    tokenizer: Tokenizer,
    grammar: Arc<dyn Grammar>,
}

impl TemplateDispatcher {
    pub fn new(config: Arc<TemplateConfig>, grammar: Arc<dyn Grammar>) -> Self {
        Self {
            config,
            tokenizer: Tokenizer::default(),
            grammar,
        }
    }

    /// Every alias declared by any template, in declaration order.
    pub fn aliases(&self) -> Vec<String> {
        self.config
            .templates
            .iter()
            .flat_map(|template| template.aliases.iter().cloned())
            .collect()
    }

    /// Renders the template output text for the given input (steps before
    /// grammar classification).
    fn render(&self, input: &str) -> Result<String, CoreError> {
        let words = self.tokenizer.split(input)?;
        let Some((verb, rest)) = words.split_first() else {
            return Err(CoreError::NoMatch);
        };
        let Some(template) = self.select_template(verb) else {
            return Err(CoreError::NoMatch);
        };

        let mut bindings: HashMap<String, String> = HashMap::new();
        bindings.insert("account".into(), self.config.default_account.clone());
        bindings.insert("date".into(), Local::now().date_naive().to_string());
        bindings.insert("command".into(), verb.clone());

        let mut args: Vec<String> = rest.to_vec();
        let delimiter = self.tokenizer.delimiter().to_string();
        if let Some(split_at) = args.iter().position(|word| *word == delimiter) {
            let target = &args[split_at + 1..];
            let [alias] = target else {
                return Err(CoreError::InvalidAccountOverride);
            };
            let account = self
                .config
                .accounts
                .get(alias)
                .ok_or_else(|| CoreError::UnknownAccountAlias(alias.clone()))?;
            bindings.insert("account".into(), account.clone());
            args.truncate(split_at);
        }

        bind_arguments(template, &args, &mut bindings)?;

        for (field, expression) in &template.computed {
            let value =
                expr::evaluate(expression, &bindings).map_err(|message| CoreError::Eval {
                    field: field.clone(),
                    message,
                })?;
            bindings.insert(field.clone(), value.render());
        }

        let mut rendered = template.template.clone();
        for (name, value) in &bindings {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        // Unresolved placeholders stay untouched so literal braces survive in
        // free text.
        Ok(rendered)
    }

    fn select_template(&self, verb: &str) -> Option<&Template> {
        self.config
            .templates
            .iter()
            .find(|template| template.aliases.iter().any(|alias| alias == verb))
    }

    fn classify(&self, text: String) -> Result<Entry, CoreError> {
        let output = self.grammar.parse(&text);
        if !output.errors.is_empty() {
            return Err(CoreError::GrammarParse {
                text,
                diagnostics: output.errors,
            });
        }
        let mut entries = output.entries;
        match entries.len() {
            0 => Ok(Entry::Raw(text)),
            1 => {
                let parsed = entries.remove(0);
                Ok(Entry::Transaction(parsed.tx))
            }
            n => Err(CoreError::MultipleEntries(n)),
        }
    }
}

fn bind_arguments(
    template: &Template,
    args: &[String],
    bindings: &mut HashMap<String, String>,
) -> Result<(), CoreError> {
    if args.len() < template.args.len() {
        return Err(CoreError::TooFewArguments {
            expected: template.args.len(),
            actual: args.len(),
        });
    }
    let capacity = template.args.len() + template.optional_args.len();
    if args.len() > capacity {
        return Err(CoreError::TooManyArguments {
            expected: capacity,
            actual: args.len(),
        });
    }

    for (name, value) in template.args.iter().zip(args) {
        bindings.insert(name.clone(), value.clone());
    }
    let remaining = &args[template.args.len()..];
    for (index, name) in template.optional_args.iter().enumerate() {
        let value = remaining.get(index).cloned().unwrap_or_default();
        bindings.insert(name.clone(), value);
    }
    Ok(())
}

impl Dispatcher for TemplateDispatcher {
    fn quick_check(&self, input: &str) -> bool {
        let Ok(words) = self.tokenizer.split(input) else {
            return false;
        };
        words
            .first()
            .is_some_and(|verb| self.select_template(verb).is_some())
    }

    fn process(&self, input: &str) -> Result<Entry, CoreError> {
        let text = self.render(input)?;
        self.classify(text)
    }

    fn name(&self) -> &str {
        "template"
    }

    fn usage(&self) -> String {
        let mut lines = Vec::with_capacity(self.config.templates.len());
        for template in &self.config.templates {
            let mut line = template.aliases.join("/");
            for arg in &template.args {
                line.push_str(&format!(" <{arg}>"));
            }
            for arg in &template.optional_args {
                line.push_str(&format!(" [{arg}]"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}
