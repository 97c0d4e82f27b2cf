#![doc(test(attr(deny(warnings))))]

//! Beanbot Core turns shorthand expense commands into double-entry ledger
//! entries and manages their lifecycle inside a plain-text ledger file.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod entry;
pub mod errors;
pub mod grammar;
pub mod service;
pub mod store;
pub mod tokenizer;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Beanbot Core tracing initialized.");
    });
}
