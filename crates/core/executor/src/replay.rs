use crate::{ExecutionError, ExecutionState, ExecutorContext, History};

/// A position in a completed [`History`] that can be moved forward, backward, or anywhere.
///
/// This is the navigation state behind step / rewind buttons and a scrubber.
#[derive(Debug, Clone)]
pub struct Replay {
    history: History,
    index: usize,
    max_index: usize,
}

impl Replay {
    /// Run the routine described by `context` to completion and start at its initial snapshot.
    pub fn new(context: ExecutorContext) -> Result<Self, ExecutionError> {
        Self::from_history(History::with_context(context))
    }

    /// Complete `history` and start at its initial snapshot.
    pub fn from_history(mut history: History) -> Result<Self, ExecutionError> {
        let max_index = history.ensure_complete()?;
        Ok(Self { history, index: 0, max_index })
    }

    /// The current position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The index of the terminal snapshot.
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// The snapshot at the current position.
    #[must_use]
    pub fn current(&self) -> &ExecutionState {
        &self.history.states()[self.index]
    }

    /// The underlying history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether [`Replay::step`] would move.
    #[must_use]
    pub fn can_step(&self) -> bool {
        !self.current().is_terminal()
    }

    /// Whether [`Replay::rewind`] would move.
    #[must_use]
    pub fn can_rewind(&self) -> bool {
        self.index > 0
    }

    /// Move one snapshot forward. Returns whether the position changed.
    pub fn step(&mut self) -> bool {
        let moved = self.can_step();
        if moved {
            self.index += 1;
        }
        moved
    }

    /// Move one snapshot back. Returns whether the position changed.
    pub fn rewind(&mut self) -> bool {
        let moved = self.can_rewind();
        if moved {
            self.index -= 1;
        }
        moved
    }

    /// Jump to `index`, clamped to the terminal snapshot.
    pub fn seek(&mut self, index: usize) -> &ExecutionState {
        self.index = index.min(self.max_index);
        self.current()
    }
}
