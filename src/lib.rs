use std::{
    error::Error,
    fmt,
    str::FromStr,
    sync::Arc,
};

use serde_derive::Deserialize;

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod diag;
pub mod lexer;
pub mod parser;
pub mod tables;
pub mod token;

pub fn parse_defines<T, U>(s: &str) -> Result<(T, U), Box<dyn Error + Send + Sync + 'static>>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
    U: FromStr,
    U::Err: Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid SYMBOL=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

/// Target processor. Ordered so that every processor supports the opcodes of those before it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Mpu {
    M6502,
    #[default]
    M65c02,
    M65816,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal MPU `{0}`: expected one of 6502, 65c02, 65816")]
pub struct MpuError(pub String);

impl Mpu {
    pub const ALL: [Mpu; 3] = [Mpu::M6502, Mpu::M65c02, Mpu::M65816];

    pub fn name(self) -> &'static str {
        match self {
            Mpu::M6502 => "6502",
            Mpu::M65c02 => "65c02",
            Mpu::M65816 => "65816",
        }
    }
}

impl FromStr for Mpu {
    type Err = MpuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mpu::ALL
            .into_iter()
            .find(|mpu| mpu.name() == s)
            .ok_or_else(|| MpuError(s.to_string()))
    }
}

impl TryFrom<String> for Mpu {
    type Error = MpuError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Mpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mnemonic notation of a source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Notation {
    /// Typist's Assembler Notation: the addressing mode is part of the mnemonic (`lda.#`).
    #[default]
    San,
    /// Traditional notation: the operand syntax selects the addressing mode (`lda #`).
    Wdc,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal notation `{0}`: expected san or wdc")]
pub struct NotationError(pub String);

impl Notation {
    pub fn name(self) -> &'static str {
        match self {
            Notation::San => "san",
            Notation::Wdc => "wdc",
        }
    }
}

impl FromStr for Notation {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "san" => Ok(Notation::San),
            "wdc" => Ok(Notation::Wdc),
            _ => Err(NotationError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Notation {
    type Error = NotationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source position. Lines and columns count from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(file: Arc<str>, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpu_names() {
        assert_eq!("6502".parse::<Mpu>(), Ok(Mpu::M6502));
        assert_eq!("65c02".parse::<Mpu>(), Ok(Mpu::M65c02));
        assert_eq!("65816".parse::<Mpu>(), Ok(Mpu::M65816));
        assert!("65C02".parse::<Mpu>().is_err());
        assert!("z80".parse::<Mpu>().is_err());
        assert_eq!(Mpu::default().to_string(), "65c02");
        assert!(Mpu::M6502 < Mpu::M65c02 && Mpu::M65c02 < Mpu::M65816);
    }

    #[test]
    fn notation_names() {
        assert_eq!("wdc".parse::<Notation>(), Ok(Notation::Wdc));
        assert_eq!(Notation::default(), Notation::San);
        assert!("intel".parse::<Notation>().is_err());
    }

    #[test]
    fn defines() {
        let (name, value) = parse_defines::<String, i32>("FOO=12").unwrap();
        assert_eq!(name, "FOO");
        assert_eq!(value, 12);
        assert!(parse_defines::<String, i32>("FOO").is_err());
    }

    #[test]
    fn pos_display() {
        let pos = Pos::new("a.s".into(), 3, 7);
        assert_eq!(pos.to_string(), "a.s:3:7");
    }
}
