use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Single-letter sustainability rating, `A` being the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn ordered() -> [Grade; 5] {
        [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E]
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        }
    }

    /// Numeric weight used when averaging: A=5 down to E=1.
    pub fn score(self) -> u8 {
        match self {
            Grade::A => 5,
            Grade::B => 4,
            Grade::C => 3,
            Grade::D => 2,
            Grade::E => 1,
        }
    }

    pub fn from_score(score: i64) -> Option<Grade> {
        Grade::ordered()
            .into_iter()
            .find(|grade| i64::from(grade.score()) == score)
    }

    /// A and B count as a "good choice" for progress tracking.
    pub fn is_good_choice(self) -> bool {
        matches!(self, Grade::A | Grade::B)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a sustainability grade (expected A-E)")]
pub struct InvalidGrade(pub String);

impl FromStr for Grade {
    type Err = InvalidGrade;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            _ => Err(InvalidGrade(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" b ".parse::<Grade>(), Ok(Grade::B));
        assert_eq!("e".parse::<Grade>(), Ok(Grade::E));
        assert!("F".parse::<Grade>().is_err());
        assert!("".parse::<Grade>().is_err());
    }

    #[test]
    fn score_round_trips_through_from_score() {
        for grade in Grade::ordered() {
            assert_eq!(Grade::from_score(i64::from(grade.score())), Some(grade));
        }
        assert_eq!(Grade::from_score(0), None);
        assert_eq!(Grade::from_score(6), None);
    }
}
