//! Instruction stream executed by the machine.
//!
//! Instructions are plain data: each variant carries its already validated
//! operands, and [`Machine::apply`](super::machine::Machine::apply) interprets
//! them. Branch targets are absolute indices into the [`Program`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of general purpose registers, `R0` through `R15`.
pub const REGISTER_COUNT: usize = 16;

/// Index of a general purpose register. Always below [`REGISTER_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Register(u8);

impl Register {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < REGISTER_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Register {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Register::new(index).ok_or_else(|| format!("register index {} out of range", index))
    }
}

impl From<Register> for u8 {
    fn from(reg: Register) -> u8 {
        reg.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A value held in a register or carried by a literal operand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Float(f64),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(x) => x,
        }
    }

    /// Integer addition wraps; a float on either side promotes the result.
    pub fn add(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            (a, b) => Value::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(b)),
            (a, b) => Value::Float(a.as_f64() - b.as_f64()),
        }
    }

    /// Signed numeric comparison. Mixed operands compare as `f64`.
    pub fn compare(self, rhs: Value) -> Ordering {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// An instruction operand: either a register to dereference or a literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Register(Register),
    Literal(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Literal(value) => write!(f, "#{}", value),
        }
    }
}

/// Branch condition, tested against the comparison flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Always,
    Eq,
    Ne,
    Lt,
    Gt,
}

impl Condition {
    /// Mnemonic as written after `B`; empty for the unconditional form.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "",
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Lt => "LT",
            Condition::Gt => "GT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Occupies slot 0 of every program.
    Nop,
    Add {
        dst: Register,
        lhs: Operand,
        rhs: Operand,
    },
    Sub {
        dst: Register,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        lhs: Operand,
        rhs: Operand,
    },
    Mov {
        dst: Register,
        src: Operand,
    },
    Halt,
    /// Produced by the linker, never written directly in source.
    Branch {
        condition: Condition,
        target: usize,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => write!(f, "NOP"),
            Instruction::Add { dst, lhs, rhs } => write!(f, "ADD {}, {}, {}", dst, lhs, rhs),
            Instruction::Sub { dst, lhs, rhs } => write!(f, "SUB {}, {}, {}", dst, lhs, rhs),
            Instruction::Cmp { lhs, rhs } => write!(f, "CMP {}, {}", lhs, rhs),
            Instruction::Mov { dst, src } => write!(f, "MOV {}, {}", dst, src),
            Instruction::Halt => write!(f, "HALT"),
            Instruction::Branch {
                condition: Condition::Always,
                target,
            } => write!(f, "B @{}", target),
            Instruction::Branch { condition, target } => {
                write!(f, "B {} @{}", condition.mnemonic(), target)
            }
        }
    }
}

/// A linked program. Slot 0 is always [`Instruction::Nop`], execution starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProgram")]
pub struct Program {
    instructions: Vec<Instruction>,
}

// Deserialized form, checked for the reserved slot before use.
#[derive(Deserialize)]
struct RawProgram {
    instructions: Vec<Instruction>,
}

impl TryFrom<RawProgram> for Program {
    type Error = String;

    fn try_from(raw: RawProgram) -> Result<Self, Self::Error> {
        match raw.instructions.first() {
            Some(Instruction::Nop) => Ok(Self {
                instructions: raw.instructions,
            }),
            Some(other) => Err(format!("slot 0 must be NOP, found {}", other)),
            None => Err("program is missing slot 0".to_string()),
        }
    }
}

impl Program {
    /// Build a program from its body, reserving the leading no-op slot.
    pub fn from_body(body: impl IntoIterator<Item = Instruction>) -> Self {
        let mut instructions = vec![Instruction::Nop];
        instructions.extend(body);
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Never true: the reserved slot is always present.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}
