//! Seam to the ledger grammar collaborator.
//!
//! The structured accounting syntax is parsed and printed by an external
//! component; this core only consumes parse results annotated with source
//! line positions. [`BeanGrammar`] is a bundled implementation covering the
//! dialect the built-in templates produce, and a full parser can be plugged
//! in behind the same trait.

mod bean;

pub use bean::BeanGrammar;

use std::fmt;

use crate::entry::Transaction;

/// Parser/printer contract for the structured ledger syntax.
pub trait Grammar: Send + Sync {
    /// Parses a whole document. Content the grammar cannot understand is
    /// reported through [`ParseOutput::errors`] rather than aborting the
    /// parse, so a single malformed line never hides the rest of the file.
    fn parse(&self, text: &str) -> ParseOutput;

    /// Prints a transaction in the grammar's textual form, newline-terminated.
    fn format(&self, tx: &Transaction) -> String;
}

/// Outcome of parsing a document.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub entries: Vec<ParsedEntry>,
    pub errors: Vec<Diagnostic>,
}

/// One parsed transaction annotated with its 1-based source lines.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub tx: Transaction,
    /// Line of the transaction header.
    pub lineno: usize,
    /// Lines of the metadata and posting sub-components.
    pub component_lines: Vec<usize>,
}

impl ParsedEntry {
    /// Last line occupied by the entry.
    pub fn max_line(&self) -> usize {
        self.component_lines
            .iter()
            .copied()
            .fold(self.lineno, usize::max)
    }
}

/// A grammar problem tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub lineno: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.lineno, self.message)
    }
}
