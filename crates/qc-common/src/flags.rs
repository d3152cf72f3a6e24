//! Ordinal QC flag scale and swappable numbering schemes.
//!
//! Tests reason about symbolic [`Flag`] values and only turn them into
//! integer codes through a [`FlagSet`], which is chosen once per processing
//! session. Nothing outside this module should hard-code a flag integer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Integer code stored in a variable's flag array.
pub type FlagCode = i8;

/// Symbolic quality flag, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// Not evaluated.
    Raw,
    Good,
    ProbablyGood,
    ProbablyBad,
    Bad,
}

impl Flag {
    /// All flags in severity order.
    pub const ALL: [Flag; 5] = [
        Flag::Raw,
        Flag::Good,
        Flag::ProbablyGood,
        Flag::ProbablyBad,
        Flag::Bad,
    ];

    /// Severity rank (raw = 0 .. bad = 4).
    pub fn severity(self) -> u8 {
        match self {
            Flag::Raw => 0,
            Flag::Good => 1,
            Flag::ProbablyGood => 2,
            Flag::ProbablyBad => 3,
            Flag::Bad => 4,
        }
    }

    /// Whether a sample carrying this flag may contribute to statistics.
    pub fn is_usable(self) -> bool {
        matches!(self, Flag::Raw | Flag::Good | Flag::ProbablyGood)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Raw => "raw",
            Flag::Good => "good",
            Flag::ProbablyGood => "probablyGood",
            Flag::ProbablyBad => "probablyBad",
            Flag::Bad => "bad",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Flag {
    type Err = FlagSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "raw" => Ok(Flag::Raw),
            "good" => Ok(Flag::Good),
            "probablygood" => Ok(Flag::ProbablyGood),
            "probablybad" => Ok(Flag::ProbablyBad),
            "bad" => Ok(Flag::Bad),
            _ => Err(FlagSetError::UnknownFlag(s.to_string())),
        }
    }
}

/// Errors raised when building or querying a flag set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagSetError {
    #[error("unknown flag name: {0}")]
    UnknownFlag(String),

    #[error("unknown flag set: {0}")]
    UnknownFlagSet(String),

    #[error("flag set {set}: {flag} code {code} collides with a usable flag code")]
    AmbiguousBadCode {
        set: String,
        flag: Flag,
        code: FlagCode,
    },
}

/// Integer codes for every symbolic flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCodes {
    pub raw: FlagCode,
    pub good: FlagCode,
    pub probably_good: FlagCode,
    pub probably_bad: FlagCode,
    pub bad: FlagCode,
}

/// A named numbering scheme mapping symbolic flags to integer codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub name: String,
    pub codes: FlagCodes,
}

impl Default for FlagSet {
    fn default() -> Self {
        Self::imos()
    }
}

impl FlagSet {
    /// Names of the built-in flag sets.
    pub const BUILTIN: [&'static str; 3] = ["imos", "argo", "qartod"];

    /// IMOS standard flags (0 = no QC performed .. 4 = bad).
    pub fn imos() -> Self {
        Self {
            name: "imos".to_string(),
            codes: FlagCodes {
                raw: 0,
                good: 1,
                probably_good: 2,
                probably_bad: 3,
                bad: 4,
            },
        }
    }

    /// Argo reference table 2 (3 = bad, potentially correctable).
    pub fn argo() -> Self {
        Self {
            name: "argo".to_string(),
            codes: FlagCodes {
                raw: 0,
                good: 1,
                probably_good: 2,
                probably_bad: 3,
                bad: 4,
            },
        }
    }

    /// QARTOD primary flags. There is no "probably good" level, so it shares
    /// the pass code.
    pub fn qartod() -> Self {
        Self {
            name: "qartod".to_string(),
            codes: FlagCodes {
                raw: 2,
                good: 1,
                probably_good: 1,
                probably_bad: 3,
                bad: 4,
            },
        }
    }

    /// Look up a built-in flag set by name.
    pub fn builtin(name: &str) -> Result<Self, FlagSetError> {
        match name.to_lowercase().as_str() {
            "imos" => Ok(Self::imos()),
            "argo" => Ok(Self::argo()),
            "qartod" => Ok(Self::qartod()),
            _ => Err(FlagSetError::UnknownFlagSet(name.to_string())),
        }
    }

    /// Build a custom flag set, rejecting schemes where a failing code could
    /// be mistaken for a usable one.
    pub fn custom(name: impl Into<String>, codes: FlagCodes) -> Result<Self, FlagSetError> {
        let set = Self {
            name: name.into(),
            codes,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check that probably-bad and bad codes are disjoint from usable codes.
    pub fn validate(&self) -> Result<(), FlagSetError> {
        let usable = [self.codes.raw, self.codes.good, self.codes.probably_good];
        for flag in [Flag::ProbablyBad, Flag::Bad] {
            let code = self.resolve(flag);
            if usable.contains(&code) {
                return Err(FlagSetError::AmbiguousBadCode {
                    set: self.name.clone(),
                    flag,
                    code,
                });
            }
        }
        Ok(())
    }

    /// Integer code for a symbolic flag.
    pub fn resolve(&self, flag: Flag) -> FlagCode {
        match flag {
            Flag::Raw => self.codes.raw,
            Flag::Good => self.codes.good,
            Flag::ProbablyGood => self.codes.probably_good,
            Flag::ProbablyBad => self.codes.probably_bad,
            Flag::Bad => self.codes.bad,
        }
    }

    /// Integer code for a flag given by name (`"probablyGood"`, `"bad"`, ...).
    pub fn resolve_name(&self, name: &str) -> Result<FlagCode, FlagSetError> {
        Ok(self.resolve(name.parse::<Flag>()?))
    }

    /// Symbolic flag for a code. When several flags share a code the most
    /// severe one wins.
    pub fn decode(&self, code: FlagCode) -> Option<Flag> {
        Flag::ALL
            .iter()
            .rev()
            .copied()
            .find(|flag| self.resolve(*flag) == code)
    }

    /// Severity of a stored code. Unknown codes rank as raw.
    pub fn severity_of(&self, code: FlagCode) -> u8 {
        self.decode(code).map(Flag::severity).unwrap_or(0)
    }

    /// Whether a stored code lets its sample contribute to statistics.
    pub fn is_usable_code(&self, code: FlagCode) -> bool {
        code == self.codes.raw || code == self.codes.good || code == self.codes.probably_good
    }
}
