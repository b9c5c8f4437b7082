//! Assembler for AQA assembly
//!
//! Parser for a single tokenized line. Each line is exactly one of a label
//! declaration, a branch, or an instruction with operands:
//!
//! ```text
//! LOOP:
//! B NE LOOP
//! SUB R0, R0, #1
//! ```
use std::iter::Peekable;

use aqa_vm::{Condition, Operand, Register, Value};

use crate::Opcode;
use crate::error::DiagnosticKind;
use crate::lexer::{Lexer, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label(String),
    Branch { condition: Condition, target: String },
    Instruction { opcode: Opcode, operands: Vec<Operand> },
}

pub type ParseResult<T> = Result<T, DiagnosticKind>;

/// Classify one operand token as a register or a literal.
pub fn classify(token: &Token) -> ParseResult<Operand> {
    let text = token.literal.as_str();
    let malformed = || DiagnosticKind::MalformedOperand(text.to_string());

    match token.kind {
        TokenKind::Literal => {
            let body = text.strip_prefix('#').ok_or_else(malformed)?;
            let body = body.strip_prefix('+').unwrap_or(body);

            if body.contains('.') {
                let value = body
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(malformed)?;
                Ok(Operand::Literal(Value::Float(value)))
            } else {
                let value = body.parse::<i32>().map_err(|_| malformed())?;
                Ok(Operand::Literal(Value::Int(value)))
            }
        }
        TokenKind::Word if text.starts_with('R') => {
            let invalid = || DiagnosticKind::InvalidRegister(text.to_string());
            let index = text[1..].parse::<u8>().map_err(|_| invalid())?;
            let reg = Register::new(index).ok_or_else(invalid)?;
            Ok(Operand::Register(reg))
        }
        _ => Err(malformed()),
    }
}

fn parse_condition(name: &str) -> Option<Condition> {
    match name {
        "EQ" => Some(Condition::Eq),
        "NE" => Some(Condition::Ne),
        "GT" => Some(Condition::Gt),
        "LT" => Some(Condition::Lt),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Parser<I>
where
    I: Iterator<Item = Token>,
{
    pub tokens: Peekable<I>,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Token>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
        }
    }

    fn expect_end(&mut self, describe: impl FnOnce(&Token) -> DiagnosticKind) -> ParseResult<()> {
        match self.tokens.next() {
            Some(token) => Err(describe(&token)),
            None => Ok(()),
        }
    }

    // B [COND] LABEL
    fn parse_branch(&mut self) -> ParseResult<Line> {
        let first = self.tokens.next().ok_or_else(|| {
            DiagnosticKind::MalformedBranch("missing target label".to_string())
        })?;
        if first.kind != TokenKind::Word {
            return Err(DiagnosticKind::MalformedBranch(format!(
                "'{}' is not a label",
                first.literal
            )));
        }

        // A condition name followed by nothing is a label of that name.
        let (condition, target) = match parse_condition(&first.literal) {
            Some(condition) if self.tokens.peek().is_some() => {
                let target = self.tokens.next().ok_or_else(|| {
                    DiagnosticKind::MalformedBranch("missing target label".to_string())
                })?;
                if target.kind != TokenKind::Word {
                    return Err(DiagnosticKind::MalformedBranch(format!(
                        "'{}' is not a label",
                        target.literal
                    )));
                }
                (condition, target.literal)
            }
            _ => (Condition::Always, first.literal),
        };

        self.expect_end(|extra| {
            DiagnosticKind::MalformedBranch(format!("unexpected '{}'", extra.literal))
        })?;

        Ok(Line::Branch { condition, target })
    }

    fn parse_instruction(&mut self, mnemonic: Token) -> ParseResult<Line> {
        let opcode = match mnemonic.kind {
            TokenKind::Word => Opcode::from_mnemonic(&mnemonic.literal),
            _ => None,
        }
        .ok_or(DiagnosticKind::UnknownOpcode(mnemonic.literal))?;

        let operands = self
            .tokens
            .by_ref()
            .map(|token| classify(&token))
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(Line::Instruction { opcode, operands })
    }

    /// Parse the whole line. `None` if the line held no tokens.
    pub fn parse(&mut self) -> ParseResult<Option<Line>> {
        let Some(token) = self.tokens.next() else {
            return Ok(None);
        };

        let line = match token.kind {
            TokenKind::Label => {
                self.expect_end(|extra| DiagnosticKind::TrailingTokens(extra.literal.clone()))?;
                Line::Label(token.literal)
            }
            TokenKind::Branch => self.parse_branch()?,
            _ => self.parse_instruction(token)?,
        };

        Ok(Some(line))
    }
}

/// Tokenize and parse a single source line.
pub fn parse_line(src: &str) -> ParseResult<Option<Line>> {
    let mut lexer = Lexer::new(src);
    Parser::new(lexer.lex()).parse()
}
