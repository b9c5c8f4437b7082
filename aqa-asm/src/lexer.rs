//! Assembler for AQA assembly
//!
//! Lexer for a single source line. Input is uppercased before scanning, so
//! mnemonics, registers and labels are case-insensitive.

use std::iter::Peekable;

#[derive(Debug, Clone)]
pub struct Lexer {
    pub src: Vec<char>,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Branch,  // B
    Label,   // name:
    Word,    // ADD, R3, LOOP
    Literal, // #42, #-7, #1.5
    Unknown, // anything else
}

/// True if the line holds nothing but whitespace and comments.
pub fn is_blank(line: &str) -> bool {
    strip_comment(line).trim().is_empty()
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find(';')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

impl Lexer {
    pub fn new(line: &str) -> Self {
        Lexer {
            src: line.to_uppercase().chars().collect(),
            pos: 0,
        }
    }

    /// Peek at the next character without consuming it.
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    /// Consume the next character if it satisfies `pred`.
    fn advance_if(&mut self, pred: impl Fn(char) -> bool) -> Option<char> {
        let c = self.peek().filter(|&c| pred(c))?;
        self.pos += 1;
        Some(c)
    }

    fn eat_digits(&mut self, value: &mut String) {
        while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
            value.push(c);
        }
    }

    // `#` followed by an optional sign, digits and an optional fraction.
    // Validation is left to the operand classifier.
    fn lex_literal(&mut self) -> Token {
        let mut value = String::new();
        if let Some(hash) = self.advance_if(|c| c == '#') {
            value.push(hash);
        }

        if let Some(sign) = self.advance_if(|c| matches!(c, '+' | '-')) {
            value.push(sign);
        }
        self.eat_digits(&mut value);

        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            value.push('.');
            self.eat_digits(&mut value);
        }

        Token {
            kind: TokenKind::Literal,
            literal: value,
        }
    }

    // Lex things that are *like* identifiers, but may not be
    // This includes the branch keyword and labels
    fn lex_ident_like(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.advance_if(|c| c.is_alphanumeric() || c == '_') {
            ident.push(c);
        }

        if self.advance_if(|c| c == ':').is_some() {
            return Token {
                kind: TokenKind::Label,
                literal: ident,
            };
        }

        let kind = if ident == "B" {
            TokenKind::Branch
        } else {
            TokenKind::Word
        };

        Token {
            kind,
            literal: ident,
        }
    }

    pub fn lex(&mut self) -> Peekable<std::vec::IntoIter<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                ';' => break,
                '/' if self.peek_ahead(1) == Some('/') => break,

                ',' => self.pos += 1,
                _ if c.is_whitespace() => self.pos += 1,

                '#' => tokens.push(self.lex_literal()),

                _ if c.is_alphanumeric() || c == '_' => {
                    tokens.push(self.lex_ident_like());
                }

                _ => {
                    self.pos += 1;
                    tokens.push(Token {
                        kind: TokenKind::Unknown,
                        literal: c.to_string(),
                    });
                }
            }
        }

        // Return an iterator over the collected tokens
        tokens.into_iter().peekable()
    }
}
