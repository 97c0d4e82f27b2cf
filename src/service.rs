use std::sync::{Arc, PoisonError, RwLock};

use crate::dispatch::DispatchChain;
use crate::entry::Entry;
use crate::errors::CoreError;
use crate::store::LedgerStore;

/// Facade exposed to transport layers: resolve shorthand input, persist the
/// result, and remove persisted entries by identity.
///
/// The dispatcher chain is an immutable snapshot behind a lock; a reload
/// swaps the snapshot atomically and never interleaves with a resolution
/// already in flight.
pub struct EntryService {
    chain: RwLock<Arc<DispatchChain>>,
    store: LedgerStore,
}

impl EntryService {
    pub fn new(chain: DispatchChain, store: LedgerStore) -> Self {
        Self {
            chain: RwLock::new(Arc::new(chain)),
            store,
        }
    }

    fn chain(&self) -> Arc<DispatchChain> {
        let guard = self.chain.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Swaps in a freshly built dispatcher chain.
    pub fn reload(&self, chain: DispatchChain) {
        *self.chain.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(chain);
        tracing::info!("dispatcher chain reloaded");
    }

    pub fn resolve(&self, input: &str) -> Result<Entry, CoreError> {
        self.chain().resolve(input)
    }

    pub fn create_from_input(&self, input: &str) -> Result<(String, Entry), CoreError> {
        self.create_from_input_with_tags(input, &[])
    }

    pub fn create_from_input_with_tags(
        &self,
        input: &str,
        extra_tags: &[String],
    ) -> Result<(String, Entry), CoreError> {
        let entry = self.resolve(input)?;
        log_unexpected(self.store.create_with_tags(entry, extra_tags))
    }

    pub fn remove(&self, identity: &str) -> Result<Entry, CoreError> {
        log_unexpected(self.store.remove(identity))
    }

    /// Name and usage text per registered dispatcher, for help surfaces.
    pub fn usages(&self) -> Vec<(String, String)> {
        self.chain().usages()
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}

/// Unexpected failures get logged with context; user-facing validation
/// errors pass through untouched for the caller to show verbatim.
fn log_unexpected<T>(result: Result<T, CoreError>) -> Result<T, CoreError> {
    if let Err(err) = &result {
        if !err.is_user_facing() {
            tracing::error!(error = %err, "ledger operation failed unexpectedly");
        }
    }
    result
}
