use std::fmt;

use crate::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Start,
    Eol,
    Empty,
    Comment,
    CommentLine,
    Directive,
    DirectivePara,
    Ellipsis,
    Opc0,
    Opc1,
    Opc2,
    WdcOp0,
    WdcOp,
    /// Any number. Only used to describe expectations, never emitted.
    Number,
    BinNum,
    HexNum,
    DecNum,
    Label,
    LocalLabel,
    AnonLabel,
    LeftSquare,
    RightSquare,
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    Greater,
    Less,
    Comma,
    Minus,
    Plus,
    Slash,
    Star,
    Hash,
    Str,
    Symbol,
    Equal,
    Ampersand,
    Pipe,
    Tilde,
    Caret,
}

#[rustfmt::skip]
const PUNCTUATION: &[(char, TokenKind)] = &[
    (',', TokenKind::Comma),
    ('-', TokenKind::Minus),
    ('+', TokenKind::Plus),
    ('@', TokenKind::AnonLabel),
    ('/', TokenKind::Slash),
    ('*', TokenKind::Star),
    ('[', TokenKind::LeftSquare),
    (']', TokenKind::RightSquare),
    ('(', TokenKind::LeftParen),
    (')', TokenKind::RightParen),
    ('>', TokenKind::Greater),
    ('<', TokenKind::Less),
    ('#', TokenKind::Hash),
    ('{', TokenKind::LeftCurly),
    ('}', TokenKind::RightCurly),
    ('=', TokenKind::Equal),
    ('&', TokenKind::Ampersand),
    ('|', TokenKind::Pipe),
    ('~', TokenKind::Tilde),
    ('^', TokenKind::Caret),
];

impl TokenKind {
    pub fn punctuation(c: char) -> Option<Self> {
        PUNCTUATION
            .iter()
            .find_map(|(p, kind)| (*p == c).then_some(*kind))
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Eof => "EOF",
            TokenKind::Start => "START",
            TokenKind::Eol => "EOL",
            TokenKind::Empty => "EMPTY",
            TokenKind::Comment => "COMMENT",
            TokenKind::CommentLine => "COMMENT_LINE",
            TokenKind::Directive => "DIREC",
            TokenKind::DirectivePara => "DIREC_PARA",
            TokenKind::Ellipsis => "ELLIPSIS",
            TokenKind::Opc0 => "OPC_0",
            TokenKind::Opc1 => "OPC_1",
            TokenKind::Opc2 => "OPC_2",
            TokenKind::WdcOp0 => "WDC_OPC_0",
            TokenKind::WdcOp => "WDC_OPC",
            TokenKind::Number => "NUMBER",
            TokenKind::BinNum => "BIN_NUM",
            TokenKind::HexNum => "HEX_NUM",
            TokenKind::DecNum => "DEC_NUM",
            TokenKind::Label => "LABEL",
            TokenKind::LocalLabel => "LOCAL_LABEL",
            TokenKind::AnonLabel => "ANON_LABEL",
            TokenKind::LeftSquare => "SQUARE_L",
            TokenKind::RightSquare => "SQUARE_R",
            TokenKind::LeftParen => "PAREN_L",
            TokenKind::RightParen => "PAREN_R",
            TokenKind::LeftCurly => "CURLY_L",
            TokenKind::RightCurly => "CURLY_R",
            TokenKind::Greater => "GREATER",
            TokenKind::Less => "LESS",
            TokenKind::Comma => "COMMA",
            TokenKind::Minus => "MINUS",
            TokenKind::Plus => "PLUS",
            TokenKind::Slash => "SLASH",
            TokenKind::Star => "STAR",
            TokenKind::Hash => "HASH",
            TokenKind::Str => "STRING",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Equal => "EQUAL",
            TokenKind::Ampersand => "AMPERSAND",
            TokenKind::Pipe => "PIPE",
            TokenKind::Tilde => "TILDE",
            TokenKind::Caret => "CARET",
        }
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            TokenKind::Number | TokenKind::BinNum | TokenKind::HexNum | TokenKind::DecNum
        )
    }

    /// Tokens that end the statements of a line.
    pub fn ends_line(self) -> bool {
        matches!(self, TokenKind::Eol | TokenKind::Eof | TokenKind::Comment)
    }

    /// Punctuation and directive tokens that may name an operator.
    pub fn may_operate(self) -> bool {
        matches!(
            self,
            TokenKind::Directive
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Slash
                | TokenKind::Star
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::Ampersand
                | TokenKind::Pipe
                | TokenKind::Tilde
                | TokenKind::Caret
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme without its prefix or delimiters: no `$`, `%`, quotes or trailing `:`.
    pub text: String,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Pos) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// The token as it would be written in source.
    pub fn lexeme(&self) -> String {
        match self.kind {
            TokenKind::BinNum => format!("%{}", self.text),
            TokenKind::HexNum => format!("${}", self.text),
            TokenKind::Str => format!("\"{}\"", self.text),
            TokenKind::Label | TokenKind::LocalLabel => format!("{}:", self.text),
            TokenKind::Eol | TokenKind::Empty | TokenKind::Eof | TokenKind::Start => String::new(),
            _ => self.text.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.pos, self.kind, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Pos::new("t.s".into(), 2, 5))
    }

    #[test]
    fn punctuation_map() {
        assert_eq!(TokenKind::punctuation('~'), Some(TokenKind::Tilde));
        assert_eq!(TokenKind::punctuation('^'), Some(TokenKind::Caret));
        assert_eq!(TokenKind::punctuation('@'), Some(TokenKind::AnonLabel));
        assert_eq!(TokenKind::punctuation('%'), None);
        assert_eq!(TokenKind::punctuation('a'), None);
    }

    #[test]
    fn lexemes_restore_prefixes() {
        assert_eq!(tok(TokenKind::HexNum, "a:2009").lexeme(), "$a:2009");
        assert_eq!(tok(TokenKind::BinNum, "10").lexeme(), "%10");
        assert_eq!(tok(TokenKind::Str, "hi").lexeme(), "\"hi\"");
        assert_eq!(tok(TokenKind::LocalLabel, "_loop").lexeme(), "_loop:");
        assert_eq!(tok(TokenKind::Opc1, "lda.#").lexeme(), "lda.#");
    }

    #[test]
    fn display() {
        assert_eq!(
            tok(TokenKind::DecNum, "12").to_string(),
            "t.s:2:5 DEC_NUM \"12\""
        );
    }
}
