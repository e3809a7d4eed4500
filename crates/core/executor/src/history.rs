//! The replayable history of a run.

use crate::{execute, ExecutionError, ExecutionReport, ExecutionState, ExecutorContext, Register};

/// Every snapshot of one run of `_factorial`, from the initial state to the terminal one.
///
/// The history is computed lazily: snapshots are produced on demand by repeatedly stepping the
/// last one, and cached. Index 0 is the initial snapshot. Each snapshot is an independent copy,
/// so extending the history never changes a snapshot handed out earlier.
#[derive(Debug, Clone)]
pub struct History {
    /// The snapshots computed so far. Never empty.
    states: Vec<ExecutionState>,

    /// The context the run was started with.
    context: ExecutorContext,

    /// Statistics about the transitions performed so far.
    report: ExecutionReport,
}

impl History {
    /// Create a history for `_factorial(4)`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(ExecutorContext::default())
    }

    /// Create a history for the run described by `context`.
    #[must_use]
    pub fn with_context(context: ExecutorContext) -> Self {
        Self {
            states: vec![ExecutionState::new(context.argument)],
            context,
            report: ExecutionReport::default(),
        }
    }

    /// The number of snapshots computed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always `false`: the initial snapshot is part of every history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether the terminal snapshot has been computed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.last().is_terminal()
    }

    /// The last snapshot computed so far.
    #[must_use]
    pub fn last(&self) -> &ExecutionState {
        // The initial snapshot is pushed on construction and never removed.
        &self.states[self.states.len() - 1]
    }

    /// The snapshots computed so far.
    #[must_use]
    pub fn states(&self) -> &[ExecutionState] {
        &self.states
    }

    /// The context the run was started with.
    #[must_use]
    pub fn context(&self) -> &ExecutorContext {
        &self.context
    }

    /// Statistics about the transitions performed so far.
    #[must_use]
    pub fn report(&self) -> &ExecutionReport {
        &self.report
    }

    /// Extend the history until it holds `len` snapshots or reaches the terminal snapshot.
    ///
    /// On error the snapshots computed before the failing transition are kept.
    pub fn ensure_length(&mut self, len: usize) -> Result<(), ExecutionError> {
        if self.states.len() >= len || self.is_complete() {
            return Ok(());
        }

        let _span = tracing::debug_span!("extend history", from = self.states.len(), to = len)
            .entered();
        while self.states.len() < len {
            let last = self.last();
            if last.is_terminal() {
                break;
            }

            let steps = (self.states.len() - 1) as u64;
            if let Some(max_steps) = self.context.max_steps {
                if steps >= max_steps {
                    return Err(ExecutionError::ExceededStepLimit(max_steps));
                }
            }

            let mut next = last.clone();
            let instruction = execute(&mut next)?;
            tracing::debug!(step = steps + 1, %instruction, "executed");
            self.report.record(instruction, &next);
            self.states.push(next);
        }

        if self.is_complete() {
            tracing::info!(
                steps = self.states.len() - 1,
                result = self.last().register(Register::ReturnValue),
                "routine returned"
            );
        }
        Ok(())
    }

    /// Extend the history up to the terminal snapshot, returning its index.
    pub fn ensure_complete(&mut self) -> Result<usize, ExecutionError> {
        self.ensure_length(usize::MAX)?;
        Ok(self.states.len() - 1)
    }

    /// The snapshot at `index`, computing it if needed.
    ///
    /// Indices past the terminal snapshot yield the terminal snapshot.
    pub fn get(&mut self, index: usize) -> Result<&ExecutionState, ExecutionError> {
        self.ensure_length(index.saturating_add(1))?;
        let index = index.min(self.states.len() - 1);
        Ok(&self.states[index])
    }

    /// Whether the snapshot at `index` is the terminal one.
    pub fn is_terminal(&mut self, index: usize) -> Result<bool, ExecutionError> {
        Ok(self.get(index)?.is_terminal())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
