use serde::{Deserialize, Serialize};

use crate::ExecutionError;

/// The address just above the deepest word of the stack. The stack grows down from here.
pub const STACK_TOP: u64 = 0xff98;

/// The size of a stack word in bytes.
pub const WORD_SIZE: u64 = 8;

/// The number of words of stack memory.
pub const NUM_STACK_WORDS: usize = 20;

/// Stack memory, addressed through [`StackMemory::address_to_index`].
///
/// Index 0 holds the word at `STACK_TOP - 8`, index 1 the word at `STACK_TOP - 16`, and so on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMemory {
    words: [u64; NUM_STACK_WORDS],
}

impl StackMemory {
    /// Map a stack address to its slot, failing for addresses outside the stack.
    pub fn address_to_index(address: u64) -> Result<usize, ExecutionError> {
        let out_of_range = ExecutionError::StackAddressOutOfRange(address);
        let offset = STACK_TOP.checked_sub(address).ok_or(out_of_range)?;
        if offset % WORD_SIZE != 0 {
            return Err(out_of_range);
        }
        let index = (offset / WORD_SIZE).checked_sub(1).ok_or(out_of_range)?;
        usize::try_from(index)
            .ok()
            .filter(|&index| index < NUM_STACK_WORDS)
            .ok_or(out_of_range)
    }

    /// Map a slot back to its stack address.
    #[must_use]
    pub const fn index_to_address(index: usize) -> u64 {
        STACK_TOP - (index as u64 + 1) * WORD_SIZE
    }

    /// Read the word at `address`.
    pub fn read(&self, address: u64) -> Result<u64, ExecutionError> {
        Ok(self.words[Self::address_to_index(address)?])
    }

    /// Write `value` to the word at `address`, returning the previous word.
    pub fn write(&mut self, address: u64, value: u64) -> Result<u64, ExecutionError> {
        let index = Self::address_to_index(address)?;
        Ok(std::mem::replace(&mut self.words[index], value))
    }

    /// The words in slot order.
    #[must_use]
    pub const fn words(&self) -> &[u64; NUM_STACK_WORDS] {
        &self.words
    }

    /// Iterate over `(address, word)` pairs from the top of the stack down.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.words.iter().enumerate().map(|(index, &word)| (Self::index_to_address(index), word))
    }
}
