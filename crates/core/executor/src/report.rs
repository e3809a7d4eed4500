use std::fmt::{Display, Formatter, Result as FmtResult};

use enum_map::EnumMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{format_word, ExecutionState, Instruction, STACK_TOP};

/// Statistics about the transitions a history has performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// How often each instruction was executed.
    pub instruction_counts: EnumMap<Instruction, u64>,
    /// The lowest stack pointer seen.
    pub lowest_stack_pointer: u64,
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self { instruction_counts: EnumMap::default(), lowest_stack_pointer: STACK_TOP }
    }
}

impl ExecutionReport {
    /// Record that `instruction` was executed and produced `state`.
    pub fn record(&mut self, instruction: Instruction, state: &ExecutionState) {
        self.instruction_counts[instruction] += 1;
        self.lowest_stack_pointer = self.lowest_stack_pointer.min(state.sp());
    }

    /// Compute the total number of instructions run.
    #[must_use]
    pub fn total_instruction_count(&self) -> u64 {
        self.instruction_counts.values().sum()
    }

    /// The deepest the stack has grown, in bytes.
    #[must_use]
    pub fn max_stack_depth(&self) -> u64 {
        STACK_TOP - self.lowest_stack_pointer
    }
}

impl Display for ExecutionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "instruction counts ({} total instructions):", self.total_instruction_count())?;
        let rows = self
            .instruction_counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .sorted_by(|(a, x), (b, y)| y.cmp(x).then(a.cmp(b)));
        for (instruction, count) in rows {
            writeln!(f, "  {count:>4}  {instruction}")?;
        }
        writeln!(
            f,
            "stack depth: {} bytes (lowest %rsp {})",
            self.max_stack_depth(),
            format_word(self.lowest_stack_pointer)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{initial_snapshot, step};

    #[test]
    fn test_record() {
        let mut report = ExecutionReport::default();
        let state = initial_snapshot();
        let next = step(&state).unwrap();
        report.record(Instruction::AllocateFrame, &next);

        assert_eq!(report.total_instruction_count(), 1);
        assert_eq!(report.instruction_counts[Instruction::AllocateFrame], 1);
        assert_eq!(report.max_stack_depth(), 0x18);

        let text = report.to_string();
        assert!(text.starts_with("instruction counts (1 total instructions):\n"));
        assert!(text.contains("     1  0x1000: subq  $0x18, %rsp\n"));
        assert!(text.ends_with("stack depth: 24 bytes (lowest %rsp 0xff80)\n"));
    }
}
