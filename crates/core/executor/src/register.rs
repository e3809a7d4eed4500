use std::fmt::{Display, Formatter};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use strum::VariantArray;

/// A register of the simulated machine.
///
/// The variants are listed in display order, which is also the order of [`Register::VARIANTS`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Enum,
    VariantArray,
)]
pub enum Register {
    /// `%rip`, the address of the next instruction to execute.
    InstructionPointer,
    /// `%rsp`, the current top of the stack.
    StackPointer,
    /// `%rdi`, the first argument register.
    Arg1,
    /// `%rax`, the accumulator and return value register.
    ReturnValue,
    /// `%rcx`, a scratch register used for counting and multiplication.
    Counter,
    /// `zf`, the zero flag of `%rflags`. Always 0 or 1.
    ZeroFlag,
}

impl Register {
    /// The label shown next to the register's value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Register::InstructionPointer => "%rip",
            Register::StackPointer => "%rsp",
            Register::Arg1 => "%rdi",
            Register::ReturnValue => "%rax",
            Register::Counter => "%rcx",
            Register::ZeroFlag => "zf",
        }
    }

    /// A short description of the role the register plays in the program.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Register::InstructionPointer => "instruction pointer",
            Register::StackPointer => "stack pointer",
            Register::Arg1 => "1st argument",
            Register::ReturnValue => "return value",
            Register::Counter => "general purpose register",
            Register::ZeroFlag => "zero flag (part of %rflags)",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The values of all registers.
pub type RegisterSet = EnumMap<Register, u64>;

/// The set of registers written by the most recent transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedRegisters(EnumMap<Register, bool>);

impl ChangedRegisters {
    /// Mark `register` as changed.
    pub fn insert(&mut self, register: Register) {
        self.0[register] = true;
    }

    /// Whether `register` was changed.
    #[must_use]
    pub fn contains(&self, register: Register) -> bool {
        self.0[register]
    }

    /// Forget every change.
    pub fn clear(&mut self) {
        self.0 = EnumMap::default();
    }

    /// Iterate over the changed registers in display order.
    pub fn iter(&self) -> impl Iterator<Item = Register> + '_ {
        self.0.iter().filter(|&(_, &changed)| changed).map(|(register, _)| register)
    }

    /// The number of changed registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no register was changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Register> for ChangedRegisters {
    fn from_iter<I: IntoIterator<Item = Register>>(iter: I) -> Self {
        let mut changed = Self::default();
        for register in iter {
            changed.insert(register);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_order() {
        let labels: Vec<_> = Register::VARIANTS.iter().map(|r| r.to_string()).collect();
        assert_eq!(labels, ["%rip", "%rsp", "%rdi", "%rax", "%rcx", "zf"]);
    }

    #[test]
    fn test_changed_registers() {
        let mut changed = ChangedRegisters::default();
        assert!(changed.is_empty());

        changed.insert(Register::ZeroFlag);
        changed.insert(Register::StackPointer);
        changed.insert(Register::StackPointer);
        assert_eq!(changed.len(), 2);
        assert!(changed.contains(Register::StackPointer));
        assert!(!changed.contains(Register::Counter));
        assert_eq!(
            changed.iter().collect::<Vec<_>>(),
            [Register::StackPointer, Register::ZeroFlag]
        );

        changed.clear();
        assert!(changed.is_empty());
    }
}
