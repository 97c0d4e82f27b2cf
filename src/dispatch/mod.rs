//! Input dispatchers and the resolution chain.

pub mod expr;
mod template;

pub use template::TemplateDispatcher;

use crate::entry::Entry;
use crate::errors::CoreError;

/// Capability contract every input dispatcher implements.
pub trait Dispatcher: Send + Sync {
    /// Cheap, possibly imprecise pre-filter. Must not fail.
    fn quick_check(&self, input: &str) -> bool;

    /// Full processing. Returns [`CoreError::NoMatch`] when the input is not
    /// for this dispatcher; any other error is a real failure.
    fn process(&self, input: &str) -> Result<Entry, CoreError>;

    fn name(&self) -> &str;

    fn usage(&self) -> String;
}

/// Ordered collection of dispatchers. Resolution tries each dispatcher in the
/// exact order it was registered; order is part of the configuration.
pub struct DispatchChain {
    dispatchers: Vec<Box<dyn Dispatcher>>,
}

impl DispatchChain {
    pub fn new(dispatchers: Vec<Box<dyn Dispatcher>>) -> Self {
        Self { dispatchers }
    }

    /// Resolves raw input to an entry via the first dispatcher that accepts
    /// it. `NoMatch` results fall through to the next dispatcher; any other
    /// failure aborts resolution immediately.
    pub fn resolve(&self, input: &str) -> Result<Entry, CoreError> {
        for dispatcher in &self.dispatchers {
            if !dispatcher.quick_check(input) {
                continue;
            }
            match dispatcher.process(input) {
                Ok(entry) => return Ok(entry),
                Err(CoreError::NoMatch) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(CoreError::UnrecognizedSyntax)
    }

    /// Name and usage text of every registered dispatcher, in order.
    pub fn usages(&self) -> Vec<(String, String)> {
        self.dispatchers
            .iter()
            .map(|dispatcher| (dispatcher.name().to_string(), dispatcher.usage()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        accepts: bool,
        outcome: fn() -> Result<Entry, CoreError>,
    }

    impl Dispatcher for Stub {
        fn quick_check(&self, _input: &str) -> bool {
            self.accepts
        }

        fn process(&self, _input: &str) -> Result<Entry, CoreError> {
            (self.outcome)()
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn usage(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn falls_through_no_match_to_the_next_dispatcher() {
        let chain = DispatchChain::new(vec![
            Box::new(Stub {
                accepts: true,
                outcome: || Err(CoreError::NoMatch),
            }),
            Box::new(Stub {
                accepts: true,
                outcome: || Ok(Entry::Raw("; ok".into())),
            }),
        ]);
        assert_eq!(chain.resolve("x").unwrap(), Entry::Raw("; ok".into()));
    }

    #[test]
    fn skips_dispatchers_whose_quick_check_declines() {
        let chain = DispatchChain::new(vec![
            Box::new(Stub {
                accepts: false,
                outcome: || Ok(Entry::Raw("; wrong".into())),
            }),
            Box::new(Stub {
                accepts: true,
                outcome: || Ok(Entry::Raw("; right".into())),
            }),
        ]);
        assert_eq!(chain.resolve("x").unwrap(), Entry::Raw("; right".into()));
    }

    #[test]
    fn hard_failures_abort_resolution() {
        let chain = DispatchChain::new(vec![
            Box::new(Stub {
                accepts: true,
                outcome: || {
                    Err(CoreError::TooManyArguments {
                        expected: 0,
                        actual: 1,
                    })
                },
            }),
            Box::new(Stub {
                accepts: true,
                outcome: || Ok(Entry::Raw("; unreachable".into())),
            }),
        ]);
        assert!(matches!(
            chain.resolve("x"),
            Err(CoreError::TooManyArguments { .. })
        ));
    }

    #[test]
    fn exhausted_chain_reports_unrecognized_syntax() {
        let chain = DispatchChain::new(vec![Box::new(Stub {
            accepts: true,
            outcome: || Err(CoreError::NoMatch),
        })]);
        assert!(matches!(
            chain.resolve("x"),
            Err(CoreError::UnrecognizedSyntax)
        ));
        assert!(matches!(
            DispatchChain::new(Vec::new()).resolve("x"),
            Err(CoreError::UnrecognizedSyntax)
        ));
    }
}
