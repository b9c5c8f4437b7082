//! Assembly diagnostics.

use std::fmt;

use thiserror::Error;

use crate::Opcode;

/// A non-blank line of the caller's source, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    /// Operand token with no recognised `#` or `R` form.
    #[error("malformed operand '{0}'")]
    MalformedOperand(String),
    /// `R` followed by something other than 0-15.
    #[error("invalid register '{0}', expected R0-R15")]
    InvalidRegister(String),
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    /// Operand class not allowed at this position.
    #[error("ARG [{index}] was {actual} but {opcode} takes {expected}")]
    InvalidArgument {
        index: usize,
        actual: String,
        opcode: Opcode,
        expected: String,
    },
    /// Operands passed the type check but do not form an instruction.
    #[error("operands do not form a {0} instruction")]
    OperandShape(Opcode),
    #[error("malformed branch: {0}")]
    MalformedBranch(String),
    #[error("unexpected '{0}' after label")]
    TrailingTokens(String),
    #[error("label '{name}' already declared at line {first_line}")]
    DuplicateLabel { name: String, first_line: usize },
    #[error("undefined label '{0}'")]
    UnresolvedLabel(String),
}

impl DiagnosticKind {
    /// Broad category, used as the prefix of rendered diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            DiagnosticKind::InvalidArgument { .. } | DiagnosticKind::OperandShape(_) => {
                "InvalidArgument"
            }
            DiagnosticKind::DuplicateLabel { .. } | DiagnosticKind::UnresolvedLabel(_) => "Link",
            _ => "Syntax",
        }
    }
}

/// One problem found while assembling, tied to the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub text: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(line: &SourceLine, kind: DiagnosticKind) -> Self {
        Self {
            line: line.number,
            text: line.text.clone(),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Error found at line {}: {}\n{}",
            self.kind.category(),
            self.line,
            self.text,
            self.kind
        )
    }
}

/// Assembly was rejected. Carries every diagnostic, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assembly failed with {} error(s)", .diagnostics.len())]
pub struct AssembleError {
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembleError {
    /// All diagnostics rendered for display, one block per diagnostic.
    pub fn display(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_rendering() {
        let line = SourceLine {
            number: 4,
            text: "ADD R0, #1.5, R1".to_string(),
        };
        let diag = Diagnostic::new(
            &line,
            DiagnosticKind::InvalidArgument {
                index: 1,
                actual: "FLOAT".to_string(),
                opcode: Opcode::Add,
                expected: "REGISTER OR INT".to_string(),
            },
        );

        assert_eq!(
            diag.to_string(),
            "InvalidArgument Error found at line 4: ADD R0, #1.5, R1\n\
             ARG [1] was FLOAT but ADD takes REGISTER OR INT"
        );
    }

    #[test]
    fn categories() {
        assert_eq!(DiagnosticKind::UnknownOpcode("MUL".into()).category(), "Syntax");
        assert_eq!(DiagnosticKind::UnresolvedLabel("X".into()).category(), "Link");
    }

    #[test]
    fn operand_shape_names_the_opcode() {
        let kind = DiagnosticKind::OperandShape(Opcode::Mov);

        assert_eq!(kind.to_string(), "operands do not form a MOV instruction");
        assert_eq!(kind.category(), "InvalidArgument");
    }
}
