//! Core of the AQA register machine.
//!
//! Sixteen registers, a comparison flag and a program counter. Each cycle
//! fetches the instruction at `pc`, applies it, and advances unless the
//! instruction wrote `pc` itself. The machine halts once `pc` leaves the
//! program.

use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

use crate::runtime::disasm;
use crate::runtime::program::{
    Condition, Instruction, Operand, Program, REGISTER_COUNT, Register, Value,
};

/// Written to `pc` by `HALT`. Larger than any program.
pub const HALT_PC: usize = usize::MAX;

/// Result of the last `CMP`. `Ne` exists for symmetry with branch conditions
/// and is never set by `CMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CmpFlag {
    Eq,
    Ne,
    Lt,
    Gt,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("step limit of {limit} exceeded at pc {pc}")]
    StepLimitExceeded { limit: u64, pc: usize },
}

/// Whether an applied instruction left `pc` for the loop to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Advance,
    Jumped,
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub flag: CmpFlag,
    pub registers: [Value; REGISTER_COUNT],
}

#[derive(Debug, Clone)]
pub struct Machine {
    pc: usize,
    flag: CmpFlag,
    registers: [Value; REGISTER_COUNT],

    steps: u64,
    step_limit: Option<u64>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            pc: 1,
            flag: CmpFlag::Null,
            registers: [Value::default(); REGISTER_COUNT],

            steps: 0,
            step_limit: None,
        }
    }

    /// Stop with [`VmError::StepLimitExceeded`] after `limit` cycles.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn flag(&self) -> CmpFlag {
        self.flag
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn registers(&self) -> &[Value; REGISTER_COUNT] {
        &self.registers
    }

    pub fn register(&self, reg: Register) -> Value {
        self.registers[reg.index()]
    }

    pub fn is_halted(&self, program: &Program) -> bool {
        self.pc >= program.len()
    }

    fn value(&self, operand: &Operand) -> Value {
        match operand {
            Operand::Register(reg) => self.register(*reg),
            Operand::Literal(value) => *value,
        }
    }

    fn branch_taken(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Ne => self.flag != CmpFlag::Eq,
            Condition::Eq => self.flag == CmpFlag::Eq,
            Condition::Lt => self.flag == CmpFlag::Lt,
            Condition::Gt => self.flag == CmpFlag::Gt,
        }
    }

    /// Apply one instruction to the machine state.
    pub fn apply(&mut self, instr: &Instruction) -> Flow {
        match instr {
            Instruction::Nop => {}

            Instruction::Add { dst, lhs, rhs } => {
                let result = self.value(lhs).add(self.value(rhs));
                self.registers[dst.index()] = result;
            }
            Instruction::Sub { dst, lhs, rhs } => {
                let result = self.value(lhs).sub(self.value(rhs));
                self.registers[dst.index()] = result;
            }
            Instruction::Mov { dst, src } => {
                self.registers[dst.index()] = self.value(src);
            }

            Instruction::Cmp { lhs, rhs } => {
                self.flag = match self.value(lhs).compare(self.value(rhs)) {
                    std::cmp::Ordering::Greater => CmpFlag::Gt,
                    std::cmp::Ordering::Less => CmpFlag::Lt,
                    std::cmp::Ordering::Equal => CmpFlag::Eq,
                };
            }

            Instruction::Halt => {
                self.pc = HALT_PC;
                return Flow::Jumped;
            }

            Instruction::Branch { condition, target } => {
                if self.branch_taken(*condition) {
                    self.pc = *target;
                    return Flow::Jumped;
                }
            }
        }

        Flow::Advance
    }

    /// Run a single fetch-execute cycle. Returns `false` once halted.
    pub fn cycle(&mut self, program: &Program) -> Result<bool, VmError> {
        let Some(instr) = program.get(self.pc) else {
            return Ok(false);
        };

        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(VmError::StepLimitExceeded { limit, pc: self.pc });
            }
        }

        trace!("{:04}: {}", self.pc, instr);

        if self.apply(instr) == Flow::Advance {
            self.pc += 1;
        }
        self.steps += 1;

        self.dump_ctx();

        Ok(!self.is_halted(program))
    }

    /// Execute `program` until it halts. The machine is consumed, a run
    /// always starts from a fresh state.
    pub fn run(mut self, program: &Program) -> Result<RunSummary, VmError> {
        debug!("running program of {} slots", program.len());

        while self.cycle(program)? {}

        debug!("halted after {} steps", self.steps);

        Ok(RunSummary {
            steps: self.steps,
            flag: self.flag,
            registers: self.registers,
        })
    }

    pub fn dump_ctx(&self) {
        if log::log_enabled!(log::Level::Trace) {
            trace!("pc: {}\tflag: {:?}\tsteps: {}", self.pc, self.flag, self.steps);
            trace!("{}", disasm::dump_registers(&self.registers));
        }
    }
}
