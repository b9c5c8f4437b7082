//! Runtime for the AQA-style register machine.
//!
//! The assembler in `aqa-asm` produces a [`Program`]; this crate runs it on a
//! fresh [`Machine`] and hands back the final register file.

pub mod runtime;

pub use runtime::machine::{CmpFlag, Flow, HALT_PC, Machine, RunSummary, VmError};
pub use runtime::program::{
    Condition, Instruction, Operand, Program, REGISTER_COUNT, Register, Value,
};

/// Run `program` to completion on a freshly constructed machine.
pub fn execute(program: &Program) -> Result<RunSummary, VmError> {
    Machine::new().run(program)
}
