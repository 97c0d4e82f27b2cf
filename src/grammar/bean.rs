use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::entry::{Amount, Posting, Transaction};

use super::{Diagnostic, Grammar, ParseOutput, ParsedEntry};

/// Date-prefixed directives that are valid ledger content but carry no
/// transaction payload. They parse cleanly and are skipped.
const DIRECTIVES: &[&str] = &[
    "open", "close", "balance", "commodity", "pad", "price", "event", "note", "document", "query",
    "custom",
];

/// Keyword-first directives without a leading date.
const PREAMBLE_DIRECTIVES: &[&str] = &["option", "plugin", "include"];

/// Line-oriented parser/printer for the beancount dialect the templates
/// produce: transaction headers with flags, payees, narrations and tags,
/// indented `key: "value"` metadata, and indented postings with optional
/// amounts. Unparseable lines become diagnostics and the parser resumes at
/// the next top-level line.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeanGrammar;

impl BeanGrammar {
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for BeanGrammar {
    fn parse(&self, text: &str) -> ParseOutput {
        let mut output = ParseOutput::default();
        let mut current: Option<ParsedEntry> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let lineno = index + 1;
            let body = raw_line.trim();
            let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');

            if body.is_empty() {
                flush(&mut current, &mut output);
                continue;
            }

            if !indented {
                flush(&mut current, &mut output);
                if body.starts_with(';') {
                    continue;
                }
                match parse_header(body) {
                    Ok(Some(tx)) => {
                        current = Some(ParsedEntry {
                            tx,
                            lineno,
                            component_lines: Vec::new(),
                        });
                    }
                    Ok(None) => {}
                    Err(message) => output.errors.push(Diagnostic { lineno, message }),
                }
                continue;
            }

            if body.starts_with(';') {
                continue;
            }

            match current.as_mut() {
                Some(entry) => {
                    // Malformed component lines still belong to the entry's
                    // span, so they are recorded before being diagnosed.
                    entry.component_lines.push(lineno);
                    if let Some((key, value)) = parse_meta(body) {
                        entry.tx.meta.push((key, value));
                    } else {
                        match parse_posting(body) {
                            Ok(posting) => entry.tx.postings.push(posting),
                            Err(message) => output.errors.push(Diagnostic { lineno, message }),
                        }
                    }
                }
                None => output.errors.push(Diagnostic {
                    lineno,
                    message: "indented line outside a transaction".into(),
                }),
            }
        }

        flush(&mut current, &mut output);
        output
    }

    fn format(&self, tx: &Transaction) -> String {
        let mut out = format!("{} {}", tx.date, tx.flag);
        if let Some(payee) = &tx.payee {
            out.push_str(&format!(" \"{}\"", escape(payee)));
        }
        out.push_str(&format!(" \"{}\"", escape(&tx.narration)));
        for tag in &tx.tags {
            out.push_str(&format!(" #{tag}"));
        }
        out.push('\n');
        for (key, value) in &tx.meta {
            out.push_str(&format!("  {key}: \"{}\"\n", escape(value)));
        }
        for posting in &tx.postings {
            match &posting.amount {
                Some(amount) => out.push_str(&format!("  {}  {amount}\n", posting.account)),
                None => out.push_str(&format!("  {}\n", posting.account)),
            }
        }
        out
    }
}

fn flush(current: &mut Option<ParsedEntry>, output: &mut ParseOutput) {
    if let Some(entry) = current.take() {
        output.entries.push(entry);
    }
}

fn parse_header(body: &str) -> Result<Option<Transaction>, String> {
    let mut parts = body.splitn(2, char::is_whitespace);
    let date_token = parts.next().unwrap_or_default();
    let Ok(date) = NaiveDate::parse_from_str(date_token, "%Y-%m-%d") else {
        if PREAMBLE_DIRECTIVES.contains(&date_token) {
            return Ok(None);
        }
        return Err("expected a date-prefixed directive".into());
    };

    let rest = parts.next().unwrap_or("").trim_start();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let flag_token = parts.next().unwrap_or_default();
    if DIRECTIVES.contains(&flag_token) {
        return Ok(None);
    }
    let flag = if flag_token == "txn" {
        '*'
    } else {
        let mut chars = flag_token.chars();
        match (chars.next(), chars.next()) {
            (Some(flag), None) => flag,
            _ => return Err("expected transaction flag".into()),
        }
    };

    let rest = parts.next().unwrap_or("").trim_start();
    let (strings, tail) = parse_quoted_strings(rest)?;
    let (payee, narration) = {
        let mut strings = strings.into_iter();
        match (strings.next(), strings.next(), strings.next()) {
            (Some(narration), None, _) => (None, narration),
            (Some(payee), Some(narration), None) => (Some(payee), narration),
            (None, ..) => return Err("transaction header missing narration".into()),
            _ => return Err("too many strings in transaction header".into()),
        }
    };

    let mut tags = BTreeSet::new();
    for token in tail.split_whitespace() {
        if let Some(tag) = token.strip_prefix('#') {
            tags.insert(tag.to_string());
        } else if !token.starts_with('^') {
            return Err(format!("unexpected token `{token}` in transaction header"));
        }
    }

    Ok(Some(Transaction {
        date,
        flag,
        payee,
        narration,
        tags,
        meta: Vec::new(),
        postings: Vec::new(),
    }))
}

/// Consumes leading double-quoted strings, returning them together with the
/// unconsumed remainder of the line.
fn parse_quoted_strings(input: &str) -> Result<(Vec<String>, &str), String> {
    let mut strings = Vec::new();
    let mut rest = input.trim_start();
    while let Some(stripped) = rest.strip_prefix('"') {
        let mut value = String::new();
        let mut end = None;
        let mut chars = stripped.char_indices();
        while let Some((idx, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        return Err("unterminated string".into());
                    };
                    value.push(escaped);
                }
                '"' => {
                    end = Some(idx);
                    break;
                }
                _ => value.push(ch),
            }
        }
        let Some(end) = end else {
            return Err("unterminated string".into());
        };
        strings.push(value);
        rest = stripped[end + 1..].trim_start();
    }
    Ok((strings, rest))
}

fn parse_meta(body: &str) -> Option<(String, String)> {
    let (key, rest) = body.split_once(':')?;
    let mut chars = key.chars();
    if !chars.next()?.is_ascii_lowercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-')) {
        return None;
    }
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((key.to_string(), unquote(rest.trim())))
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(ch);
            }
        }
        out
    } else {
        value.to_string()
    }
}

fn parse_posting(body: &str) -> Result<Posting, String> {
    let mut tokens = body.split_whitespace();
    let account = tokens.next().unwrap_or_default();
    if !account.contains(':') {
        return Err(format!("expected an account name, found `{account}`"));
    }
    let rest: Vec<&str> = tokens.collect();
    let Some((currency, number_tokens)) = rest.split_last() else {
        return Ok(Posting {
            account: account.to_string(),
            amount: None,
        });
    };
    if number_tokens.is_empty() {
        return Err("posting amount is missing a currency".into());
    }
    let number = number_tokens.concat();
    if !number
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | ','))
    {
        return Err(format!("invalid amount `{number}`"));
    }
    let currency_ok = currency
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_uppercase())
        && currency
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '\''));
    if !currency_ok {
        return Err(format!("invalid currency `{currency}`"));
    }
    Ok(Posting {
        account: account.to_string(),
        amount: Some(Amount {
            number,
            currency: currency.to_string(),
        }),
    })
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
