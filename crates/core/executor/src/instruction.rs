//! The instructions of the `_factorial` routine.

use std::fmt::Display;

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::VariantArray;

/// The symbol the routine is compiled under.
pub const PROGRAM_LABEL: &str = "_factorial";

/// The address of the first instruction of the routine.
pub const PROGRAM_ENTRY: u64 = 0x1000;

/// The address the recursive call pushes onto the stack.
pub const RETURN_ADDRESS: u64 = 0x1040;

/// Words at or above this value are displayed as addresses.
pub const MIN_ADDRESS: u64 = PROGRAM_ENTRY;

/// One instruction of the compiled `_factorial` routine.
///
/// The routine is fixed, so each variant stands for exactly one instruction at one address, and
/// executing it is a fixed transition on the machine state. The variants are declared in address
/// order.
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
pub enum Instruction {
    /// `rsp ← rsp - 0x18`, sets zf.
    AllocateFrame,
    /// `m64(rsp + 0x8) ← rdi`
    SpillArgument,
    /// `zf ← m64(rsp + 0x8) == 0`
    CompareArgument,
    /// `rip ← zf == 0 ? 0x1023 : 0x1015`
    BranchIfNonZero,
    /// `m64(rsp + 0x10) ← 1`
    StoreBaseResult,
    /// `rip ← 0x104d`
    JumpToEpilogue,
    /// `rax ← m64(rsp + 0x8)`
    LoadAccumulator,
    /// `rcx ← m64(rsp + 0x8)`
    LoadCounter,
    /// `rcx ← rcx - 1`, sets zf.
    DecrementCounter,
    /// `rdi ← rcx`
    SetArgument,
    /// `m64(rsp) ← rax`
    SaveAccumulator,
    /// `rsp ← rsp - 8`, `m64(rsp) ← 0x1040`, `rip ← 0x1000`
    Call,
    /// `rcx ← m64(rsp)`
    ReloadCounter,
    /// `rcx ← rcx * rax`
    Multiply,
    /// `m64(rsp + 0x10) ← rcx`
    StoreProduct,
    /// `rax ← m64(rsp + 0x10)`
    LoadResult,
    /// `rsp ← rsp + 0x18`, sets zf.
    FreeFrame,
    /// `rip ← m64(rsp)`, `rsp ← rsp + 8`
    Return,
}

impl Instruction {
    /// The address the instruction is located at.
    #[must_use]
    pub const fn address(self) -> u64 {
        match self {
            Instruction::AllocateFrame => 0x1000,
            Instruction::SpillArgument => 0x1004,
            Instruction::CompareArgument => 0x1009,
            Instruction::BranchIfNonZero => 0x100f,
            Instruction::StoreBaseResult => 0x1015,
            Instruction::JumpToEpilogue => 0x101e,
            Instruction::LoadAccumulator => 0x1023,
            Instruction::LoadCounter => 0x1028,
            Instruction::DecrementCounter => 0x102d,
            Instruction::SetArgument => 0x1034,
            Instruction::SaveAccumulator => 0x1037,
            Instruction::Call => 0x103b,
            Instruction::ReloadCounter => 0x1040,
            Instruction::Multiply => 0x1044,
            Instruction::StoreProduct => 0x1048,
            Instruction::LoadResult => 0x104d,
            Instruction::FreeFrame => 0x1052,
            Instruction::Return => 0x1056,
        }
    }

    /// Look up the instruction located at `address`.
    #[must_use]
    pub const fn from_address(address: u64) -> Option<Self> {
        let instruction = match address {
            0x1000 => Instruction::AllocateFrame,
            0x1004 => Instruction::SpillArgument,
            0x1009 => Instruction::CompareArgument,
            0x100f => Instruction::BranchIfNonZero,
            0x1015 => Instruction::StoreBaseResult,
            0x101e => Instruction::JumpToEpilogue,
            0x1023 => Instruction::LoadAccumulator,
            0x1028 => Instruction::LoadCounter,
            0x102d => Instruction::DecrementCounter,
            0x1034 => Instruction::SetArgument,
            0x1037 => Instruction::SaveAccumulator,
            0x103b => Instruction::Call,
            0x1040 => Instruction::ReloadCounter,
            0x1044 => Instruction::Multiply,
            0x1048 => Instruction::StoreProduct,
            0x104d => Instruction::LoadResult,
            0x1052 => Instruction::FreeFrame,
            0x1056 => Instruction::Return,
            _ => return None,
        };
        Some(instruction)
    }

    /// The AT&T assembly text of the instruction.
    #[must_use]
    pub const fn assembly(self) -> &'static str {
        match self {
            Instruction::AllocateFrame => "subq  $0x18, %rsp",
            Instruction::SpillArgument => "movq  %rdi, 0x8(%rsp)",
            Instruction::CompareArgument => "cmpq  $0x0, 0x8(%rsp)",
            Instruction::BranchIfNonZero => "jne   0x1023",
            Instruction::StoreBaseResult => "movq  $0x1, 0x10(%rsp)",
            Instruction::JumpToEpilogue => "jmp   0x104d",
            Instruction::LoadAccumulator => "movq  0x8(%rsp), %rax",
            Instruction::LoadCounter => "movq  0x8(%rsp), %rcx",
            Instruction::DecrementCounter => "subq  $0x1, %rcx",
            Instruction::SetArgument => "movq  %rcx, %rdi",
            Instruction::SaveAccumulator => "movq  %rax, (%rsp)",
            Instruction::Call => "callq  _factorial",
            Instruction::ReloadCounter => "movq  (%rsp), %rcx",
            Instruction::Multiply => "imulq %rax, %rcx",
            Instruction::StoreProduct => "movq  %rcx, 0x10(%rsp)",
            Instruction::LoadResult => "movq  0x10(%rsp), %rax",
            Instruction::FreeFrame => "addq  $0x18, %rsp",
            Instruction::Return => "retq",
        }
    }

    /// Whether the instruction writes to stack memory.
    #[must_use]
    pub const fn writes_stack(self) -> bool {
        matches!(
            self,
            Instruction::SpillArgument
                | Instruction::StoreBaseResult
                | Instruction::SaveAccumulator
                | Instruction::Call
                | Instruction::StoreProduct
        )
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}: {}", self.address(), self.assembly())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_ascending() {
        let addresses: Vec<_> = Instruction::VARIANTS.iter().map(|i| i.address()).collect();
        assert_eq!(addresses.len(), 18);
        assert!(addresses.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(addresses[0], PROGRAM_ENTRY);
    }

    #[test]
    fn test_from_address() {
        for &instruction in Instruction::VARIANTS {
            assert_eq!(Instruction::from_address(instruction.address()), Some(instruction));
        }
        assert_eq!(Instruction::from_address(RETURN_ADDRESS), Some(Instruction::ReloadCounter));
        assert_eq!(Instruction::from_address(0x1001), None);
        assert_eq!(Instruction::from_address(0), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::AllocateFrame.to_string(), "0x1000: subq  $0x18, %rsp");
        assert_eq!(Instruction::Return.to_string(), "0x1056: retq");
    }
}
