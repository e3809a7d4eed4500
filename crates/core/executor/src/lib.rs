//! An instruction-level simulator for a compiled recursive factorial routine.
//!
//! The [`executor`] module advances a machine snapshot by one instruction, and [`History`]
//! records every snapshot of a run so it can be replayed and searched at random.

#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![warn(missing_docs)]

mod context;
pub mod executor;
mod history;
mod instruction;
mod logger;
mod memory;
mod register;
mod replay;
mod report;
mod state;
mod utils;

pub use context::*;
pub use executor::{execute, step, ExecutionError};
pub use history::*;
pub use instruction::*;
pub use logger::*;
pub use memory::*;
pub use register::*;
pub use replay::*;
pub use report::*;
pub use state::*;
pub use utils::*;
