//! Grades and difficulty levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal critique grade, `A` best to `F` worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    /// Middle grade; used when the service omits one
    #[default]
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Parse a grade leniently: `"b"`, `"B+"` and `"Grade: B"` all yield `B`.
    /// Anything other than a lone letter with an optional `+`/`-` is `None`.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text
            .strip_prefix("Grade:")
            .or_else(|| text.strip_prefix("grade:"))
            .unwrap_or(text)
            .trim();
        let letter = text.strip_suffix(['+', '-']).unwrap_or(text);
        let mut chars = letter.chars();
        let (Some(first), None) = (chars.next(), chars.next()) else {
            return None;
        };
        match first.to_ascii_uppercase() {
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'C' => Some(Grade::C),
            'D' => Some(Grade::D),
            'F' => Some(Grade::F),
            _ => None,
        }
    }

    /// Whether the grade counts as a pass
    pub fn is_passing(&self) -> bool {
        *self <= Grade::C
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Practice difficulty; parametrizes prompt strictness and tone only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
