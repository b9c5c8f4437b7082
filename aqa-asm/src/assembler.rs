//! Assembler for AQA assembly
//!
//! Two-pass assembler.
//!
//! The first pass walks the source once, assigning every non-label line an
//! instruction index starting at 1. Labels record the index of the line that
//! follows them, instructions are type checked and built, and branches are
//! left pending. The second pass links each pending branch against the label
//! table. A program is produced only if no diagnostic was recorded.

use std::collections::HashMap;

use log::{debug, trace};

use aqa_vm::{Condition, Instruction, Operand, Program};

use crate::Opcode;
use crate::checker::Checker;
use crate::error::{AssembleError, Diagnostic, DiagnosticKind, SourceLine};
use crate::lexer;
use crate::parser::{self, Line};

/// Where a label points and where it was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEntry {
    pub index: usize,
    pub line: usize,
}

/// A branch awaiting its target address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJump {
    pub index: usize,
    pub condition: Condition,
    pub label: String,
    pub source: SourceLine,
}

/// What the first pass put at an instruction index.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Ready(Instruction),
    Pending,
    // Reserved by a line that failed to assemble, keeps later indices stable
    Rejected,
}

/// Drop blank and comment-only lines, numbering the rest from 1 as they
/// appeared in the input.
pub fn preprocess<I, S>(source: I) -> Vec<SourceLine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    source
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !lexer::is_blank(line.as_ref()))
        .map(|(i, line)| SourceLine {
            number: i + 1,
            text: line.as_ref().trim_end().to_string(),
        })
        .collect()
}

/// Resolve pending branches against the label table.
///
/// Pure with respect to its inputs: returns the branch instruction for each
/// jump, keyed by index, or the diagnostics for every unresolved label.
pub fn link(
    labels: &HashMap<String, LabelEntry>,
    jumps: &[PendingJump],
) -> Result<HashMap<usize, Instruction>, Vec<Diagnostic>> {
    let mut resolved = HashMap::new();
    let mut unresolved = Vec::new();

    for jump in jumps {
        match labels.get(&jump.label) {
            Some(entry) => {
                resolved.insert(
                    jump.index,
                    Instruction::Branch {
                        condition: jump.condition,
                        target: entry.index,
                    },
                );
            }
            None => unresolved.push(Diagnostic::new(
                &jump.source,
                DiagnosticKind::UnresolvedLabel(jump.label.clone()),
            )),
        }
    }

    if unresolved.is_empty() {
        Ok(resolved)
    } else {
        Err(unresolved)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    // Labels to resolve to instruction indices
    pub labels: HashMap<String, LabelEntry>,
    pub jumps: Vec<PendingJump>,

    slots: Vec<Slot>,
    checker: Checker,
    // Structural errors: malformed lines, duplicate and unresolved labels
    errors: Vec<Diagnostic>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next instruction line will occupy.
    fn next_index(&self) -> usize {
        self.slots.len() + 1
    }

    fn visit_label(&mut self, line: &SourceLine, name: String) {
        let index = self.next_index();

        if let Some(first) = self.labels.get(&name) {
            self.errors.push(Diagnostic::new(
                line,
                DiagnosticKind::DuplicateLabel {
                    name,
                    first_line: first.line,
                },
            ));
            return;
        }

        trace!("label {} -> {}", name, index);
        self.labels.insert(
            name,
            LabelEntry {
                index,
                line: line.number,
            },
        );
    }

    fn visit_branch(&mut self, line: &SourceLine, condition: Condition, target: String) {
        let index = self.next_index();
        self.jumps.push(PendingJump {
            index,
            condition,
            label: target,
            source: line.clone(),
        });
        self.slots.push(Slot::Pending);
    }

    fn visit_instruction(&mut self, line: &SourceLine, opcode: Opcode, operands: &[Operand]) {
        if !self.checker.check(line, opcode, operands) {
            self.slots.push(Slot::Rejected);
            return;
        }

        match opcode.build(operands) {
            Some(instr) => {
                trace!("{:04}: {}", self.next_index(), instr);
                self.slots.push(Slot::Ready(instr));
            }
            None => {
                self.errors
                    .push(Diagnostic::new(line, DiagnosticKind::OperandShape(opcode)));
                self.slots.push(Slot::Rejected);
            }
        }
    }

    fn visit_line(&mut self, line: &SourceLine) {
        match parser::parse_line(&line.text) {
            Ok(Some(Line::Label(name))) => self.visit_label(line, name),
            Ok(Some(Line::Branch { condition, target })) => {
                self.visit_branch(line, condition, target)
            }
            Ok(Some(Line::Instruction { opcode, operands })) => {
                self.visit_instruction(line, opcode, &operands)
            }
            Ok(None) => {}
            Err(kind) => {
                // The line still takes an index so later labels stay put
                self.errors.push(Diagnostic::new(line, kind));
                self.slots.push(Slot::Rejected);
            }
        }
    }

    // --------------------------------------

    /// Assemble the given source lines into a program.
    pub fn assemble<I, S>(&mut self, source: I) -> Result<Program, AssembleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.labels.clear();
        self.jumps.clear();
        self.slots.clear();
        self.errors.clear();
        self.checker = Checker::new();

        // First pass: labels, instructions and pending branches
        let lines = preprocess(source);
        debug!("assembler: first pass over {} lines", lines.len());
        for line in &lines {
            self.visit_line(line);
        }
        debug!(
            "assembler: {} slots, {} labels, {} branches",
            self.slots.len(),
            self.labels.len(),
            self.jumps.len()
        );

        // Second pass: link branches
        let resolved = match link(&self.labels, &self.jumps) {
            Ok(resolved) => resolved,
            Err(unresolved) => {
                self.errors.extend(unresolved);
                HashMap::new()
            }
        };

        let body = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Slot::Ready(instr) => Some(*instr),
                Slot::Pending => resolved.get(&(i + 1)).copied(),
                Slot::Rejected => None,
            })
            .collect::<Option<Vec<_>>>();

        let mut diagnostics = self.errors.clone();
        diagnostics.extend(self.checker.diagnostics().iter().cloned());

        match body {
            Some(body) if diagnostics.is_empty() => Ok(Program::from_body(body)),
            _ => {
                diagnostics.sort_by_key(|d| d.line);
                debug!("assembler: rejected with {} diagnostics", diagnostics.len());
                Err(AssembleError { diagnostics })
            }
        }
    }

    /// Assemble newline separated source text.
    pub fn assemble_source(&mut self, source: &str) -> Result<Program, AssembleError> {
        self.assemble(source.lines())
    }
}

/// Assemble `source` lines with a fresh assembler.
pub fn assemble<I, S>(source: I) -> Result<Program, AssembleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Assembler::new().assemble(source)
}

pub fn assemble_source(source: &str) -> Result<Program, AssembleError> {
    Assembler::new().assemble_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqa_vm::{Operand, Register, Value};

    fn kinds(err: &AssembleError) -> Vec<&DiagnosticKind> {
        err.diagnostics.iter().map(|d| &d.kind).collect()
    }

    #[test]
    fn preprocess_keeps_input_line_numbers() {
        let lines = preprocess(["", "MOV R0, #1", "   ", "; note", "HALT  "]);
        assert_eq!(
            lines,
            [
                SourceLine {
                    number: 2,
                    text: "MOV R0, #1".to_string()
                },
                SourceLine {
                    number: 5,
                    text: "HALT".to_string()
                },
            ]
        );
    }

    #[test]
    fn labels_mark_the_next_instruction() {
        let mut asm = Assembler::new();
        let program = asm
            .assemble(["MOV R0, #3", "LOOP:", "SUB R0, R0, #1", "END:", "HALT"])
            .unwrap();

        assert_eq!(asm.labels["LOOP"].index, 2);
        assert_eq!(asm.labels["END"].index, 3);
        assert_eq!(program.len(), 4);
    }

    #[test]
    fn branches_resolve_forward_and_backward() {
        let program = assemble(["top:", "B end", "B NE top", "end:"]).unwrap();

        assert_eq!(
            program.instructions(),
            [
                Instruction::Nop,
                Instruction::Branch {
                    condition: Condition::Always,
                    target: 3,
                },
                Instruction::Branch {
                    condition: Condition::Ne,
                    target: 1,
                },
            ]
        );
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert!(assemble(["Loop:", "B loop"]).is_ok());
    }

    #[test]
    fn builds_instructions() {
        let program = assemble_source("mov r3, #-4\nadd r3, r3, #1\nhalt").unwrap();
        let r3 = Register::new(3).unwrap();

        assert_eq!(
            program.get(1),
            Some(&Instruction::Mov {
                dst: r3,
                src: Operand::Literal(Value::Int(-4)),
            })
        );
        assert_eq!(
            program.get(2),
            Some(&Instruction::Add {
                dst: r3,
                lhs: Operand::Register(r3),
                rhs: Operand::Literal(Value::Int(1)),
            })
        );
        assert_eq!(program.get(3), Some(&Instruction::Halt));
    }

    #[test]
    fn unresolved_label() {
        let err = assemble(["MOV R0, #1", "B NOWHERE"]).unwrap_err();

        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].line, 2);
        assert_eq!(
            err.diagnostics[0].kind,
            DiagnosticKind::UnresolvedLabel("NOWHERE".to_string())
        );
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = assemble(["A:", "HALT", "A:", "HALT"]).unwrap_err();

        assert_eq!(
            kinds(&err),
            [&DiagnosticKind::DuplicateLabel {
                name: "A".to_string(),
                first_line: 1,
            }]
        );
        assert_eq!(err.diagnostics[0].line, 3);
    }

    #[test]
    fn collects_every_error_in_line_order() {
        let err = assemble([
            "MOV R0, 7",
            "FOO R1",
            "ADD R0, #1.5, R1",
            "B MISSING",
            "HALT R2",
        ])
        .unwrap_err();

        let lines = err.diagnostics.iter().map(|d| d.line).collect::<Vec<_>>();
        assert_eq!(lines, [1, 2, 3, 4, 5]);
        assert!(matches!(
            err.diagnostics[0].kind,
            DiagnosticKind::MalformedOperand(_)
        ));
        assert!(matches!(
            err.diagnostics[1].kind,
            DiagnosticKind::UnknownOpcode(_)
        ));
        assert!(matches!(
            err.diagnostics[2].kind,
            DiagnosticKind::InvalidArgument { index: 1, .. }
        ));
    }

    #[test]
    fn nul_does_not_hide_trailing_tokens() {
        let err = assemble_source("MOV R0, #1\0 GARBAGE TOKENS HERE\nHALT").unwrap_err();

        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].line, 1);
        assert_eq!(
            err.diagnostics[0].kind,
            DiagnosticKind::MalformedOperand("\0".to_string())
        );
    }

    #[test]
    fn assembler_is_reusable() {
        let mut asm = Assembler::new();
        assert!(asm.assemble(["B X"]).is_err());

        let program = asm.assemble(["X:", "HALT"]).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(asm.labels.len(), 1);
    }
}
