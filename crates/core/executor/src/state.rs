use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strum::VariantArray;

use crate::{
    format_word, ChangedRegisters, ExecutionError, Instruction, Register, RegisterSet,
    StackMemory, PROGRAM_ENTRY, STACK_TOP,
};

/// The argument `_factorial` is first called with.
pub const DEFAULT_ARGUMENT: u64 = 4;

/// A snapshot of the machine between two instructions.
///
/// Besides the registers and stack memory, a snapshot records which registers and which stack
/// word the transition that produced it wrote to. These are only used to highlight changes and
/// are recomputed by every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// The register values.
    pub registers: RegisterSet,

    /// The stack memory.
    pub stack: StackMemory,

    /// The registers written by the transition that produced this snapshot. The instruction
    /// pointer is never included since every transition moves it.
    pub changed_registers: ChangedRegisters,

    /// The stack address written by the transition that produced this snapshot, if any.
    pub changed_stack_address: Option<u64>,
}

impl ExecutionState {
    /// Create the snapshot `_factorial(argument)` starts from.
    #[must_use]
    pub fn new(argument: u64) -> Self {
        let mut registers = RegisterSet::default();
        registers[Register::InstructionPointer] = PROGRAM_ENTRY;
        registers[Register::StackPointer] = STACK_TOP;
        registers[Register::Arg1] = argument;
        Self {
            registers,
            stack: StackMemory::default(),
            changed_registers: ChangedRegisters::default(),
            changed_stack_address: None,
        }
    }

    /// The value of `register`.
    #[must_use]
    pub fn register(&self, register: Register) -> u64 {
        self.registers[register]
    }

    /// The instruction pointer.
    #[must_use]
    pub fn pc(&self) -> u64 {
        self.registers[Register::InstructionPointer]
    }

    /// The stack pointer.
    #[must_use]
    pub fn sp(&self) -> u64 {
        self.registers[Register::StackPointer]
    }

    /// The instruction the instruction pointer refers to.
    pub fn instruction(&self) -> Result<Instruction, ExecutionError> {
        Instruction::from_address(self.pc())
            .ok_or(ExecutionError::InvalidInstructionPointer(self.pc()))
    }

    /// The stack word at `address`.
    pub fn stack_word(&self, address: u64) -> Result<u64, ExecutionError> {
        self.stack.read(address)
    }

    /// Whether `address` lies in allocated stack, i.e. at or above the stack pointer.
    #[must_use]
    pub fn is_live(&self, address: u64) -> bool {
        address >= self.sp()
    }

    /// Whether the routine has returned to its first caller with the stack fully unwound.
    ///
    /// Reaching `retq` is not enough: nested calls pass through it with their frames still on
    /// the stack.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.pc() == Instruction::Return.address() && self.sp() == STACK_TOP
    }

    /// Write a register, marking it as changed.
    pub(crate) fn rw(&mut self, register: Register, value: u64) {
        self.registers[register] = value;
        if register != Register::InstructionPointer {
            self.changed_registers.insert(register);
        }
    }

    /// Set the zero flag from `value`, marking it as changed.
    pub(crate) fn set_zero_flag(&mut self, value: u64) {
        self.rw(Register::ZeroFlag, u64::from(value == 0));
    }

    /// Read the stack word at `address`.
    pub(crate) fn mr(&self, address: u64) -> Result<u64, ExecutionError> {
        self.stack.read(address)
    }

    /// Write the stack word at `address`, marking it as changed.
    pub(crate) fn mw(&mut self, address: u64, value: u64) -> Result<(), ExecutionError> {
        self.stack.write(address, value)?;
        self.changed_stack_address = Some(address);
        Ok(())
    }

    /// Forget the changes made by the previous transition.
    pub(crate) fn clear_changes(&mut self) {
        self.changed_registers.clear();
        self.changed_stack_address = None;
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new(DEFAULT_ARGUMENT)
    }
}

/// The snapshot every run of `_factorial(4)` starts from.
#[must_use]
pub fn initial_snapshot() -> ExecutionState {
    ExecutionState::default()
}

impl Display for ExecutionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let marker = |changed: bool| if changed { "*" } else { "" };

        writeln!(f, "registers:")?;
        for &register in Register::VARIANTS {
            let value = format_word(self.register(register));
            let changed = self.changed_registers.contains(register);
            writeln!(f, "  {:<5} {value}{}", register.label(), marker(changed))?;
        }

        writeln!(f, "stack:")?;
        writeln!(f, "  {STACK_TOP:#x}  (return address)")?;
        for (address, word) in self.stack.iter() {
            let changed = self.changed_stack_address == Some(address);
            let word = if self.is_live(address) { format_word(word) } else { "-".to_string() };
            write!(f, "  {address:#x}  {word}{}", marker(changed))?;
            if address == self.sp() {
                write!(f, " <- %rsp")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
