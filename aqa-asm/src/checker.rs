//! Operand type checking.
//!
//! Every operand has exactly one [`OperandClass`]. An opcode's signature
//! holds one [`ClassSet`] per operand position, and an instruction is well
//! typed when each operand's class is a member of the set at its position.
//! Mismatches are collected rather than returned so that one pass over the
//! source reports every bad argument.

use bitflags::bitflags;
use log::trace;

use aqa_vm::{Operand, Value};

use crate::Opcode;
use crate::error::{Diagnostic, DiagnosticKind, SourceLine};

bitflags! {
    /// A union of operand classes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassSet: u8 {
        const REGISTER = 1 << 0;
        const POSITIVE_INT = 1 << 1;
        const NEGATIVE_INT = 1 << 2;
        const FLOAT = 1 << 3;

        const INT = Self::POSITIVE_INT.bits() | Self::NEGATIVE_INT.bits();
        const NUMERIC = Self::INT.bits() | Self::FLOAT.bits();
        const ANY = Self::REGISTER.bits() | Self::NUMERIC.bits();
    }
}

/// The empty set: the position takes no operand.
pub const NONE: ClassSet = ClassSet::empty();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    Register,
    PositiveInteger,
    NegativeInteger,
    Float,
}

impl OperandClass {
    pub fn of(operand: &Operand) -> Self {
        match operand {
            Operand::Register(_) => OperandClass::Register,
            Operand::Literal(Value::Int(i)) if *i >= 0 => OperandClass::PositiveInteger,
            Operand::Literal(Value::Int(_)) => OperandClass::NegativeInteger,
            Operand::Literal(Value::Float(_)) => OperandClass::Float,
        }
    }
}

impl From<OperandClass> for ClassSet {
    fn from(class: OperandClass) -> Self {
        match class {
            OperandClass::Register => ClassSet::REGISTER,
            OperandClass::PositiveInteger => ClassSet::POSITIVE_INT,
            OperandClass::NegativeInteger => ClassSet::NEGATIVE_INT,
            OperandClass::Float => ClassSet::FLOAT,
        }
    }
}

/// Human readable name of a class set, e.g. `INT` or `REGISTER OR INT`.
pub fn describe(set: ClassSet) -> String {
    let named = [
        (ClassSet::ANY, "ANY"),
        (ClassSet::REGISTER, "REGISTER"),
        (ClassSet::NUMERIC, "NUMERIC"),
        (ClassSet::INT, "INT"),
        (ClassSet::POSITIVE_INT, "POSITIVE INTEGER"),
        (ClassSet::NEGATIVE_INT, "NEGATIVE INTEGER"),
        (ClassSet::FLOAT, "FLOAT"),
    ];

    if set.is_empty() {
        return "NONE".to_string();
    }

    // Greedily cover the set with the largest named groups first.
    let mut rest = set;
    let mut parts = Vec::new();
    for (group, name) in named {
        if rest.contains(group) {
            parts.push(name);
            rest.remove(group);
        }
    }
    parts.join(" OR ")
}

/// Collects type-check diagnostics across a whole assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Checker {
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `operands` against `opcode`'s signature, recording one
    /// diagnostic per offending position. Returns whether the instruction is
    /// well typed.
    pub fn check(&mut self, line: &SourceLine, opcode: Opcode, operands: &[Operand]) -> bool {
        let signature = opcode.signature();
        let positions = signature.len().max(operands.len());
        let mut well_typed = true;

        for index in 0..positions {
            let expected = signature.get(index).copied().unwrap_or(NONE);
            let actual = operands
                .get(index)
                .map(|op| ClassSet::from(OperandClass::of(op)))
                .unwrap_or(NONE);

            let matched = expected & actual;
            // A missing operand only fits a position that takes none.
            let fits = matched == actual && (actual != NONE || expected == NONE);
            if fits {
                continue;
            }

            trace!(
                "line {}: {} arg {} is {:?}, expected {:?}",
                line.number, opcode, index, actual, expected
            );

            well_typed = false;
            self.diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::InvalidArgument {
                    index,
                    actual: describe(actual),
                    opcode,
                    expected: describe(expected),
                },
            ));
        }

        well_typed
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
