//! Source-level representations of the 128-bit wide integer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a fixture variant spells the wide integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Representation {
    /// The toolchain's builtin 128-bit integer.
    Native,
    /// Two 64-bit halves in a struct forced to 16-byte alignment.
    EmulatedAligned,
    /// Two 64-bit halves in a struct with natural 8-byte alignment.
    EmulatedUnaligned,
}

impl Representation {
    pub const ALL: [Self; 3] = [Self::Native, Self::EmulatedAligned, Self::EmulatedUnaligned];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::EmulatedAligned => "emulated-aligned",
            Self::EmulatedUnaligned => "emulated-unaligned",
        }
    }

    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "native" | "i128" => Some(Self::Native),
            "emulated-aligned" | "aligned" => Some(Self::EmulatedAligned),
            "emulated-unaligned" | "unaligned" => Some(Self::EmulatedUnaligned),
            _ => None,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parsing_accepts_underscores_and_aliases() {
        assert_eq!(
            Representation::from_str_loose("Emulated_Aligned"),
            Some(Representation::EmulatedAligned)
        );
        assert_eq!(
            Representation::from_str_loose("unaligned"),
            Some(Representation::EmulatedUnaligned)
        );
        assert_eq!(Representation::from_str_loose("u256"), None);
    }

    #[test]
    fn serde_uses_kebab_names() {
        let json = serde_json::to_string(&Representation::EmulatedUnaligned).unwrap();
        assert_eq!(json, "\"emulated-unaligned\"");
    }
}
