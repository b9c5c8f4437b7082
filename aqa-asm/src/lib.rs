pub mod assembler;
pub mod checker;
pub mod error;
pub mod lexer;
pub mod parser;

use std::fmt;

use aqa_vm::{Instruction, Operand};

use checker::{ClassSet, NONE};

pub use assembler::{Assembler, assemble, assemble_source};
pub use error::{AssembleError, Diagnostic, DiagnosticKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Cmp,
    Mov,
    Halt,
}

const REG_OR_INT: ClassSet = ClassSet::REGISTER.union(ClassSet::INT);
const REG_OR_NUM: ClassSet = ClassSet::REGISTER.union(ClassSet::NUMERIC);

impl Opcode {
    /// Look up an (uppercased) mnemonic.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        match name {
            "ADD" => Some(Opcode::Add),
            "SUB" => Some(Opcode::Sub),
            "CMP" => Some(Opcode::Cmp),
            "MOV" => Some(Opcode::Mov),
            "HALT" => Some(Opcode::Halt),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Cmp => "CMP",
            Opcode::Mov => "MOV",
            Opcode::Halt => "HALT",
        }
    }

    /// Allowed operand classes, one set per position.
    pub fn signature(self) -> &'static [ClassSet] {
        match self {
            Opcode::Add | Opcode::Sub => &[ClassSet::REGISTER, REG_OR_INT, REG_OR_INT],
            Opcode::Cmp => &[REG_OR_NUM, REG_OR_NUM],
            Opcode::Mov => &[ClassSet::REGISTER, REG_OR_NUM],
            Opcode::Halt => &[NONE],
        }
    }

    /// Build the instruction for already type checked operands.
    ///
    /// Returns `None` when the operands do not fit the opcode's shape.
    pub fn build(self, operands: &[Operand]) -> Option<Instruction> {
        match (self, operands) {
            (Opcode::Add, [Operand::Register(dst), lhs, rhs]) => Some(Instruction::Add {
                dst: *dst,
                lhs: *lhs,
                rhs: *rhs,
            }),
            (Opcode::Sub, [Operand::Register(dst), lhs, rhs]) => Some(Instruction::Sub {
                dst: *dst,
                lhs: *lhs,
                rhs: *rhs,
            }),
            (Opcode::Cmp, [lhs, rhs]) => Some(Instruction::Cmp {
                lhs: *lhs,
                rhs: *rhs,
            }),
            (Opcode::Mov, [Operand::Register(dst), src]) => Some(Instruction::Mov {
                dst: *dst,
                src: *src,
            }),
            (Opcode::Halt, []) => Some(Instruction::Halt),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqa_vm::{Register, Value};

    #[test]
    fn mnemonic_round_trip() {
        for op in [Opcode::Add, Opcode::Sub, Opcode::Cmp, Opcode::Mov, Opcode::Halt] {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("MUL"), None);
    }

    #[test]
    fn build_matches_signature_arity() {
        let r0 = Operand::Register(Register::new(0).unwrap());
        let one = Operand::Literal(Value::Int(1));

        assert!(Opcode::Add.build(&[r0, r0, one]).is_some());
        assert!(Opcode::Sub.build(&[r0, one, one]).is_some());
        assert!(Opcode::Cmp.build(&[one, r0]).is_some());
        assert!(Opcode::Mov.build(&[r0, one]).is_some());
        assert!(Opcode::Halt.build(&[]).is_some());

        assert!(Opcode::Mov.build(&[one, r0]).is_none());
        assert!(Opcode::Add.build(&[r0, r0]).is_none());
    }

    #[test]
    fn halt_signature_is_none() {
        assert_eq!(Opcode::Halt.signature(), &[NONE]);
    }
}
