use serde::{Deserialize, Serialize};

use crate::DEFAULT_ARGUMENT;

/// Context to run `_factorial` under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorContext {
    /// The value `%rdi` holds when the routine is first entered.
    pub argument: u64,

    /// The maximum number of transitions to perform.
    ///
    /// Note: `None` means the history runs until the routine returns.
    pub max_steps: Option<u64>,
}

impl Default for ExecutorContext {
    fn default() -> Self {
        Self { argument: DEFAULT_ARGUMENT, max_steps: None }
    }
}

/// A builder for [`ExecutorContext`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorContextBuilder {
    argument: Option<u64>,
    max_steps: Option<u64>,
}

impl ExecutorContext {
    /// Create a new context builder. See [`ExecutorContextBuilder`] for more details.
    #[must_use]
    pub fn builder() -> ExecutorContextBuilder {
        ExecutorContextBuilder::new()
    }
}

impl ExecutorContextBuilder {
    /// Create a new [`ExecutorContextBuilder`].
    ///
    /// Prefer using [`ExecutorContext::builder`].
    #[must_use]
    pub fn new() -> Self {
        ExecutorContextBuilder::default()
    }

    /// Build and return the [`ExecutorContext`].
    ///
    /// Clears and resets the builder, allowing it to be reused.
    pub fn build(&mut self) -> ExecutorContext {
        let builder = std::mem::take(self);
        ExecutorContext {
            argument: builder.argument.unwrap_or(DEFAULT_ARGUMENT),
            max_steps: builder.max_steps,
        }
    }

    /// Set the argument the routine is called with.
    ///
    /// Arguments above 4 recurse deeper than the stack memory allows.
    pub fn argument(&mut self, argument: u64) -> &mut Self {
        self.argument = Some(argument);
        self
    }

    /// Set the maximum number of transitions the history may perform.
    pub fn max_steps(&mut self, max_steps: u64) -> &mut Self {
        self.max_steps = Some(max_steps);
        self
    }
}
