use thiserror::Error;

use crate::grammar::Diagnostic;

/// Error type covering tokenizing, template dispatch, and ledger file failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The tokenizer rejected the input. `position` is the 0-based character
    /// index of the offending character, or the input length when the input
    /// ended inside a string or escape.
    #[error("syntax error at position {position}: unexpected character")]
    Syntax { position: usize },
    /// Internal signal: this dispatcher cannot handle the input. Converted to
    /// [`CoreError::UnrecognizedSyntax`] once the whole chain is exhausted.
    #[error("input does not match any template")]
    NoMatch,
    #[error("unrecognized entry syntax")]
    UnrecognizedSyntax,
    #[error("too few arguments: expected at least {expected}, got {actual}")]
    TooFewArguments { expected: usize, actual: usize },
    #[error("too many arguments: expected at most {expected}, got {actual}")]
    TooManyArguments { expected: usize, actual: usize },
    #[error("destination override expects exactly one account alias")]
    InvalidAccountOverride,
    #[error("unknown account alias `{0}`")]
    UnknownAccountAlias(String),
    #[error("computed field `{field}`: {message}")]
    Eval { field: String, message: String },
    #[error("template produced {0} entries, expected at most one")]
    MultipleEntries(usize),
    #[error("{}", render_grammar_failure(.text, .diagnostics))]
    GrammarParse {
        text: String,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("entry not found")]
    EntryNotFound,
    #[error("invalid template configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    /// Recoverable validation errors whose message is shown verbatim to the
    /// end user. Everything else is logged with context and reported as a
    /// generic failure.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Serde(_) | Self::Config(_))
    }
}

fn render_grammar_failure(text: &str, diagnostics: &[Diagnostic]) -> String {
    let mut message = String::from("ledger grammar rejected the content:");
    for diagnostic in diagnostics {
        message.push('\n');
        message.push_str(&diagnostic.to_string());
    }
    if !text.is_empty() {
        message.push('\n');
        message.push_str(text.trim_end());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_user_facing() {
        assert!(CoreError::Syntax { position: 3 }.is_user_facing());
        assert!(CoreError::EntryNotFound.is_user_facing());
        assert!(CoreError::UnknownAccountAlias("qq".into()).is_user_facing());
        assert!(!CoreError::Config("bad".into()).is_user_facing());
    }

    #[test]
    fn grammar_failure_lists_diagnostics() {
        let err = CoreError::GrammarParse {
            text: "bad text".into(),
            diagnostics: vec![Diagnostic {
                lineno: 2,
                message: "expected transaction flag".into(),
            }],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("line 2: expected transaction flag"));
        assert!(rendered.contains("bad text"));
    }
}
