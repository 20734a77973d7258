use std::{fmt, io};

use crate::{token::TokenKind, Mpu, Notation, Pos};

/// Problems found while tokenizing. Each is reported and scanning carries on.
#[derive(thiserror::Error, Debug)]
pub enum LexError {
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
    #[error("can't find closing quotation mark")]
    UnterminatedString,
    #[error("local label `{0}` must start with a letter after the underscore")]
    LocalLabel(String),
    #[error("can't process character `{0}`")]
    IllegalChar(char),
    #[error(".include needs a quoted file name")]
    IncludeName,
    #[error("cant open include file `{0}`: {1}")]
    IncludeOpen(String, io::Error),
    #[error("recursive include of `{0}`")]
    RecursiveInclude(String),
}

/// Grammar violations. The first one stops the parse.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no tokens to parse")]
    Empty,
    #[error("{pos}: expected {want}, found {found} `{text}`")]
    Expected {
        pos: Pos,
        want: Want,
        found: TokenKind,
        text: String,
    },
    #[error("{pos}: RPN term is missing its closing `}}`")]
    UnterminatedRpn { pos: Pos },
    #[error("{pos}: directive `{text}` can't be used as a value")]
    NotAValue { pos: Pos, text: String },
    #[error("{pos}: `{text}` needs at least one parameter")]
    MissingParameter { pos: Pos, text: String },
}

/// What the parser was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    Token(TokenKind),
    Statement,
    Value,
    Register,
}

impl fmt::Display for Want {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Want::Token(kind) => write!(f, "{kind}"),
            Want::Statement => f.write_str("statement"),
            Want::Value => f.write_str("value"),
            Want::Register => f.write_str("index register"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("can't convert `{text}` to a base {radix} number")]
pub struct NumberError {
    pub text: String,
    pub radix: u32,
}

/// Problems found while analyzing. Each is reported and the walk carries on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error(transparent)]
    Number(#[from] NumberError),
    #[error("mnemonic `{mnemonic}` is not available on the {mpu}")]
    UnknownMnemonic { mnemonic: String, mpu: Mpu },
    #[error("no addressing mode of `{0}` matches the operand")]
    NoAddressingMode(String),
    #[error("`brk` needs a signature byte")]
    BrkSignature,
    #[error(transparent)]
    IllegalMpu(#[from] crate::MpuError),
    #[error("source requires the {found} but the {requested} was selected")]
    MpuMismatch { found: Mpu, requested: Mpu },
    #[error(transparent)]
    IllegalNotation(#[from] crate::NotationError),
    #[error("source is written in {found} notation but {requested} was selected")]
    NotationMismatch {
        found: Notation,
        requested: Notation,
    },
    #[error("symbol `{name}` already defined at {first}")]
    Redefined { name: String, first: Pos },
}

/// Why a run failed.
#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("cant open file `{0}`: {1}")]
    Open(String, io::Error),
    #[error("tokenizer found {0} error(s)")]
    Lexical(usize),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("analyzer found {0} error(s)")]
    Semantic(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

/// Collects the recoverable errors of a run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, pos: &Pos, err: impl fmt::Display) {
        let diagnostic = Diagnostic {
            pos: pos.clone(),
            message: err.to_string(),
        };
        tracing::error!("{diagnostic}");
        self.reports.push(diagnostic);
    }

    pub fn count(&self) -> usize {
        self.reports.len()
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_carry_position() {
        let mut diag = Diagnostics::new();
        let pos = Pos::new("a.s".into(), 4, 2);
        diag.report(&pos, LexError::IllegalChar('`'));
        diag.report(
            &pos,
            SemanticError::MpuMismatch {
                found: Mpu::M65816,
                requested: Mpu::M6502,
            },
        );
        assert_eq!(diag.count(), 2);
        assert_eq!(
            diag.reports()[0].to_string(),
            "a.s:4:2: can't process character ```"
        );
        assert!(diag.reports()[1].message.contains("65816"));
    }

    #[test]
    fn parse_error_text() {
        let err = ParseError::Expected {
            pos: Pos::new("a.s".into(), 1, 9),
            want: Want::Token(TokenKind::Symbol),
            found: TokenKind::DecNum,
            text: "12".into(),
        };
        assert_eq!(err.to_string(), "a.s:1:9: expected SYMBOL, found DEC_NUM `12`");
    }
}
