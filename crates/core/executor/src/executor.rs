//! The transition function of the machine.

use thiserror::Error;

use crate::{ExecutionState, Instruction, Register, RETURN_ADDRESS};

/// Errors that can occur while executing the routine.
///
/// Both stepping errors are invariant violations: they mean a snapshot was corrupted or the
/// routine outgrew its stack, and retrying reproduces them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    /// The instruction pointer does not point at an instruction of the routine.
    #[error("unexpected %rip: {0:#x}")]
    InvalidInstructionPointer(u64),

    /// A stack access fell outside the stack memory.
    #[error("stack address {0:#x} is out of range")]
    StackAddressOutOfRange(u64),

    /// The history needed more transitions than it is allowed to perform.
    #[error("exceeded step limit of {0}")]
    ExceededStepLimit(u64),
}

/// Execute one instruction, returning the resulting snapshot.
///
/// `state` is left untouched; on error no partially updated snapshot escapes.
pub fn step(state: &ExecutionState) -> Result<ExecutionState, ExecutionError> {
    let mut next = state.clone();
    execute(&mut next)?;
    Ok(next)
}

/// Execute the instruction the instruction pointer refers to in place, returning it.
///
/// On error `state` may be partially updated and should be discarded.
pub fn execute(state: &mut ExecutionState) -> Result<Instruction, ExecutionError> {
    let instruction = state.instruction()?;
    state.clear_changes();
    execute_instruction(state, instruction)?;
    Ok(instruction)
}

fn execute_instruction(
    state: &mut ExecutionState,
    instruction: Instruction,
) -> Result<(), ExecutionError> {
    let rsp = state.sp();
    let next = match instruction {
        Instruction::AllocateFrame => {
            let rsp = rsp.wrapping_sub(0x18);
            state.rw(Register::StackPointer, rsp);
            state.set_zero_flag(rsp);
            Instruction::SpillArgument
        }
        Instruction::SpillArgument => {
            state.mw(rsp.wrapping_add(0x8), state.register(Register::Arg1))?;
            Instruction::CompareArgument
        }
        Instruction::CompareArgument => {
            let argument = state.mr(rsp.wrapping_add(0x8))?;
            state.set_zero_flag(argument);
            Instruction::BranchIfNonZero
        }
        Instruction::BranchIfNonZero => {
            if state.register(Register::ZeroFlag) == 0 {
                Instruction::LoadAccumulator
            } else {
                Instruction::StoreBaseResult
            }
        }
        Instruction::StoreBaseResult => {
            state.mw(rsp.wrapping_add(0x10), 1)?;
            Instruction::JumpToEpilogue
        }
        Instruction::JumpToEpilogue => Instruction::LoadResult,
        Instruction::LoadAccumulator => {
            let argument = state.mr(rsp.wrapping_add(0x8))?;
            state.rw(Register::ReturnValue, argument);
            Instruction::LoadCounter
        }
        Instruction::LoadCounter => {
            let argument = state.mr(rsp.wrapping_add(0x8))?;
            state.rw(Register::Counter, argument);
            Instruction::DecrementCounter
        }
        Instruction::DecrementCounter => {
            let rcx = state.register(Register::Counter).wrapping_sub(1);
            state.rw(Register::Counter, rcx);
            state.set_zero_flag(rcx);
            Instruction::SetArgument
        }
        Instruction::SetArgument => {
            state.rw(Register::Arg1, state.register(Register::Counter));
            Instruction::SaveAccumulator
        }
        Instruction::SaveAccumulator => {
            state.mw(rsp, state.register(Register::ReturnValue))?;
            Instruction::Call
        }
        Instruction::Call => {
            // Push the return address.
            let rsp = rsp.wrapping_sub(0x8);
            state.rw(Register::StackPointer, rsp);
            state.mw(rsp, RETURN_ADDRESS)?;
            Instruction::AllocateFrame
        }
        Instruction::ReloadCounter => {
            let saved = state.mr(rsp)?;
            state.rw(Register::Counter, saved);
            Instruction::Multiply
        }
        Instruction::Multiply => {
            let rcx = state.register(Register::Counter);
            let product = rcx.wrapping_mul(state.register(Register::ReturnValue));
            state.rw(Register::Counter, product);
            Instruction::StoreProduct
        }
        Instruction::StoreProduct => {
            state.mw(rsp.wrapping_add(0x10), state.register(Register::Counter))?;
            Instruction::LoadResult
        }
        Instruction::LoadResult => {
            let result = state.mr(rsp.wrapping_add(0x10))?;
            state.rw(Register::ReturnValue, result);
            Instruction::FreeFrame
        }
        Instruction::FreeFrame => {
            let rsp = rsp.wrapping_add(0x18);
            state.rw(Register::StackPointer, rsp);
            state.set_zero_flag(rsp);
            Instruction::Return
        }
        Instruction::Return => {
            // The return address is data, so it does not name a successor instruction.
            let return_address = state.mr(rsp)?;
            state.rw(Register::InstructionPointer, return_address);
            state.rw(Register::StackPointer, rsp.wrapping_add(0x8));
            return Ok(());
        }
    };
    state.rw(Register::InstructionPointer, next.address());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{initial_snapshot, ChangedRegisters, STACK_TOP};

    /// Run `_factorial(4)` up to the first snapshot whose instruction pointer is `target`.
    fn state_at(target: Instruction) -> ExecutionState {
        let mut state = initial_snapshot();
        while state.pc() != target.address() {
            state = step(&state).unwrap();
        }
        state
    }

    #[rstest]
    #[case(Instruction::AllocateFrame, &[Register::StackPointer, Register::ZeroFlag], false)]
    #[case(Instruction::SpillArgument, &[], true)]
    #[case(Instruction::CompareArgument, &[Register::ZeroFlag], false)]
    #[case(Instruction::BranchIfNonZero, &[], false)]
    #[case(Instruction::StoreBaseResult, &[], true)]
    #[case(Instruction::JumpToEpilogue, &[], false)]
    #[case(Instruction::LoadAccumulator, &[Register::ReturnValue], false)]
    #[case(Instruction::LoadCounter, &[Register::Counter], false)]
    #[case(Instruction::DecrementCounter, &[Register::Counter, Register::ZeroFlag], false)]
    #[case(Instruction::SetArgument, &[Register::Arg1], false)]
    #[case(Instruction::SaveAccumulator, &[], true)]
    #[case(Instruction::Call, &[Register::StackPointer], true)]
    #[case(Instruction::ReloadCounter, &[Register::Counter], false)]
    #[case(Instruction::Multiply, &[Register::Counter], false)]
    #[case(Instruction::StoreProduct, &[], true)]
    #[case(Instruction::LoadResult, &[Register::ReturnValue], false)]
    #[case(Instruction::FreeFrame, &[Register::StackPointer, Register::ZeroFlag], false)]
    #[case(Instruction::Return, &[Register::StackPointer], false)]
    fn test_changes(
        #[case] instruction: Instruction,
        #[case] registers: &[Register],
        #[case] writes_stack: bool,
    ) {
        let state = state_at(instruction);
        let next = step(&state).unwrap();
        let expected: ChangedRegisters = registers.iter().copied().collect();
        assert_eq!(next.changed_registers, expected);
        assert_eq!(next.changed_stack_address.is_some(), writes_stack);
        assert_eq!(instruction.writes_stack(), writes_stack);
    }

    #[test]
    fn test_first_frame() {
        let state = initial_snapshot();

        let state = step(&state).unwrap();
        assert_eq!(state.pc(), 0x1004);
        assert_eq!(state.sp(), 0xff80);
        assert_eq!(state.register(Register::ZeroFlag), 0);

        let state = step(&state).unwrap();
        assert_eq!(state.pc(), 0x1009);
        assert_eq!(state.stack_word(0xff88), Ok(4));
        assert_eq!(state.changed_stack_address, Some(0xff88));
        assert!(state.changed_registers.is_empty());

        let state = step(&state).unwrap();
        assert_eq!(state.register(Register::ZeroFlag), 0);

        // The argument is non-zero, so the branch is taken.
        let state = step(&state).unwrap();
        assert_eq!(state.pc(), Instruction::LoadAccumulator.address());
    }

    #[test]
    fn test_call_pushes_return_address() {
        let state = state_at(Instruction::Call);
        assert_eq!(state.sp(), 0xff80);

        let state = step(&state).unwrap();
        assert_eq!(state.pc(), Instruction::AllocateFrame.address());
        assert_eq!(state.sp(), 0xff78);
        assert_eq!(state.stack_word(0xff78), Ok(RETURN_ADDRESS));
        assert_eq!(state.stack_word(0xff80), Ok(4));
        assert_eq!(state.register(Register::Arg1), 3);
        assert_eq!(state.changed_stack_address, Some(0xff78));
    }

    #[test]
    fn test_base_case() {
        let mut state = ExecutionState::new(0);
        for _ in 0..4 {
            state = step(&state).unwrap();
        }
        assert_eq!(state.register(Register::ZeroFlag), 1);
        assert_eq!(state.pc(), Instruction::StoreBaseResult.address());

        let state = step(&state).unwrap();
        assert_eq!(state.stack_word(0xff90), Ok(1));
        let state = step(&state).unwrap();
        assert_eq!(state.pc(), Instruction::LoadResult.address());
        let state = step(&state).unwrap();
        assert_eq!(state.register(Register::ReturnValue), 1);
        let state = step(&state).unwrap();
        assert_eq!(state.sp(), STACK_TOP);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_return_restores_caller() {
        let mut state = state_at(Instruction::Return);
        // The first return reached is the innermost one.
        assert_eq!(state.sp(), 0xff18);
        assert_eq!(state.stack_word(0xff18), Ok(RETURN_ADDRESS));
        state = step(&state).unwrap();
        assert_eq!(state.pc(), RETURN_ADDRESS);
        assert_eq!(state.sp(), 0xff20);
        assert_eq!(state.register(Register::ReturnValue), 1);
    }

    #[test]
    fn test_step_is_deterministic() {
        let mut a = initial_snapshot();
        let mut b = initial_snapshot();
        for _ in 0..40 {
            a = step(&a).unwrap();
            b = step(&b).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_stack_round_trip() {
        let mut state = initial_snapshot();
        while !state.is_terminal() {
            state = step(&state).unwrap();
            if let Some(address) = state.changed_stack_address {
                let mut probe = state.clone();
                probe.mw(address, 0xdead).unwrap();
                assert_eq!(probe.mr(address), Ok(0xdead));
            }
        }
    }

    #[test]
    fn test_invalid_instruction_pointer() {
        let mut state = initial_snapshot();
        state.registers[Register::InstructionPointer] = 0x2000;
        assert_eq!(step(&state), Err(ExecutionError::InvalidInstructionPointer(0x2000)));
        assert_eq!(
            ExecutionError::InvalidInstructionPointer(0x2000).to_string(),
            "unexpected %rip: 0x2000"
        );
    }

    #[test]
    fn test_out_of_range_leaves_state_untouched() {
        let mut state = initial_snapshot();
        state.registers[Register::InstructionPointer] = Instruction::ReloadCounter.address();
        let before = state.clone();
        assert_eq!(step(&state), Err(ExecutionError::StackAddressOutOfRange(STACK_TOP)));
        assert_eq!(state, before);
    }
}
