use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::grammar::Grammar;

/// Metadata key carrying the unique identity assigned at creation.
pub const META_UUID: &str = "beanbot_uuid";
/// Metadata key carrying the creation timestamp.
pub const META_TIME: &str = "beanbot_time";

/// One persisted ledger record: a structured transaction or an opaque block.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Transaction(Transaction),
    Raw(String),
}

impl Entry {
    /// Renders the entry the way it is written into the ledger body.
    pub fn render(&self, grammar: &dyn Grammar) -> String {
        match self {
            Self::Transaction(tx) => grammar.format(tx),
            Self::Raw(text) => text.clone(),
        }
    }

    /// Identity assigned by the store, if present.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Transaction(tx) => tx.meta_value(META_UUID),
            Self::Raw(_) => None,
        }
    }
}

/// A double-entry transaction in the shape the grammar collaborator produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub flag: char,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: BTreeSet<String>,
    /// Metadata in declaration order.
    pub meta: Vec<(String, String)>,
    pub postings: Vec<Posting>,
}

impl Transaction {
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Inserts or replaces a metadata value, preserving declaration order.
    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.meta.iter_mut().find(|(name, _)| name == key) {
            Some(slot) => slot.1 = value,
            None => self.meta.push((key.to_string(), value)),
        }
    }
}

/// One account/amount line within a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub account: String,
    pub amount: Option<Amount>,
}

/// Amounts keep their source text; this core never does arithmetic on them.
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub number: String,
    pub currency: String,
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}
