use std::{
    error::Error,
    fs, mem,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};
use serde_derive::Deserialize;

use crate::{analyzer::parse_literal, Mpu, Notation};

/// Project settings read from a TOML file.
///
/// ```toml
/// mpu = "65816"
/// notation = "san"
/// include = ["inc", "../common"]
///
/// [defines]
/// DEBUG = 1
/// VRAM = "$40:00"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mpu: Option<Mpu>,

    #[serde(default)]
    pub notation: Option<Notation>,

    #[serde(default)]
    pub include: Vec<PathBuf>,

    #[serde(default, deserialize_with = "deserialize_defines")]
    pub defines: IndexMap<String, i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefineValue {
    Int(i64),
    Text(String),
}

fn deserialize_defines<'de, D>(deserializer: D) -> Result<IndexMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, DefineValue>::deserialize(deserializer)?;
    let mut defines = IndexMap::new();
    for (name, value) in raw {
        let value = match value {
            DefineValue::Int(value) => value,
            DefineValue::Text(buf) => parse_literal(&buf)
                .map_err(|e| de::Error::custom(format!("{buf} is not a valid value: {e}")))?,
        };
        defines.insert(name, value);
    }
    Ok(defines)
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path).map_err(|e| format!("cant open file: {e}"))?;
        let config = Self::parse(&text).map_err(|e| format!("{}: {e}", path.display()))?;
        tracing::debug!("loaded config {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies command line settings on top of the file. Command line include directories
    /// are searched first and command line defines replace those of the same name.
    pub fn overlay(
        mut self,
        mpu: Option<Mpu>,
        notation: Option<Notation>,
        include: Vec<PathBuf>,
        defines: impl IntoIterator<Item = (String, i64)>,
    ) -> Self {
        self.mpu = mpu.or(self.mpu);
        self.notation = notation.or(self.notation);
        let from_file = mem::replace(&mut self.include, include);
        self.include.extend(from_file);
        self.defines.extend(defines);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
            mpu = "65816"
            notation = "wdc"
            include = ["inc"]

            [defines]
            DEBUG = 1
            VRAM = "$40:00"
            MASK = "%1010"
            "#,
        )
        .unwrap();
        assert_eq!(config.mpu, Some(Mpu::M65816));
        assert_eq!(config.notation, Some(Notation::Wdc));
        assert_eq!(config.include, [PathBuf::from("inc")]);
        let defines: Vec<_> = config
            .defines
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        assert_eq!(defines, [("DEBUG", 1), ("VRAM", 0x4000), ("MASK", 10)]);
    }

    #[test]
    fn empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.mpu, None);
        assert!(config.include.is_empty());
        assert!(config.defines.is_empty());
    }

    #[test]
    fn bad_values() {
        assert!(Config::parse("mpu = \"z80\"").is_err());
        assert!(Config::parse("notation = \"intel\"").is_err());
        assert!(Config::parse("[defines]\nX = \"$zz\"").is_err());
        assert!(Config::parse("output = \"a.bin\"").is_err());
    }

    #[test]
    fn command_line_wins() {
        let config = Config::parse("mpu = \"6502\"\ninclude = [\"lib\"]\n[defines]\nA = 1\nB = 2")
            .unwrap()
            .overlay(
                Some(Mpu::M65c02),
                None,
                vec![PathBuf::from("mine")],
                [("B".to_string(), 5)],
            );
        assert_eq!(config.mpu, Some(Mpu::M65c02));
        assert_eq!(config.notation, None);
        assert_eq!(config.include, [PathBuf::from("mine"), PathBuf::from("lib")]);
        assert_eq!(config.defines.get("A"), Some(&1));
        assert_eq!(config.defines.get("B"), Some(&5));
    }
}
