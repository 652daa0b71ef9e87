//! The fixed set of supported tag families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// AprilTag family, named `<bits²>h<min hamming>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TagFamily {
    #[default]
    #[serde(rename = "16h5")]
    Tag16h5,
    #[serde(rename = "25h7")]
    Tag25h7,
    #[serde(rename = "25h9")]
    Tag25h9,
    #[serde(rename = "36h9")]
    Tag36h9,
    #[serde(rename = "36h11")]
    Tag36h11,
}

/// Outcome of resolving a configured family name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyChoice {
    pub family: TagFamily,
    /// `Some(name)` when `name` was not recognized and the default was used.
    pub rejected: Option<String>,
}

impl FamilyChoice {
    pub fn fell_back(&self) -> bool {
        self.rejected.is_some()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tag family `{0}` (expected one of 16h5, 25h7, 25h9, 36h9, 36h11)")]
pub struct UnknownFamily(pub String);

impl TagFamily {
    pub const ALL: [TagFamily; 5] = [
        TagFamily::Tag16h5,
        TagFamily::Tag25h7,
        TagFamily::Tag25h9,
        TagFamily::Tag36h9,
        TagFamily::Tag36h11,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TagFamily::Tag16h5 => "16h5",
            TagFamily::Tag25h7 => "25h7",
            TagFamily::Tag25h9 => "25h9",
            TagFamily::Tag36h9 => "36h9",
            TagFamily::Tag36h11 => "36h11",
        }
    }

    /// Data cells per side, excluding the black border.
    pub fn marker_size(self) -> usize {
        match self {
            TagFamily::Tag16h5 => 4,
            TagFamily::Tag25h7 | TagFamily::Tag25h9 => 5,
            TagFamily::Tag36h9 | TagFamily::Tag36h11 => 6,
        }
    }

    /// Minimum pairwise Hamming distance of the codebook (over all rotations).
    pub fn min_hamming(self) -> u8 {
        match self {
            TagFamily::Tag16h5 => 5,
            TagFamily::Tag25h7 => 7,
            TagFamily::Tag25h9 | TagFamily::Tag36h9 => 9,
            TagFamily::Tag36h11 => 11,
        }
    }

    /// Map a configured name to a family, falling back to [`TagFamily::default`].
    pub fn resolve(name: &str) -> FamilyChoice {
        match name.parse::<TagFamily>() {
            Ok(family) => FamilyChoice {
                family,
                rejected: None,
            },
            Err(_) => FamilyChoice {
                family: TagFamily::default(),
                rejected: Some(name.to_string()),
            },
        }
    }
}

impl FromStr for TagFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let bare = lower.strip_prefix("tag").unwrap_or(&lower);
        TagFamily::ALL
            .into_iter()
            .find(|f| f.name() == bare)
            .ok_or_else(|| UnknownFamily(trimmed.to_string()))
    }
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_with_and_without_prefix() {
        assert_eq!("36h11".parse::<TagFamily>(), Ok(TagFamily::Tag36h11));
        assert_eq!("tag25h9".parse::<TagFamily>(), Ok(TagFamily::Tag25h9));
        assert_eq!(" Tag16h5 ".parse::<TagFamily>(), Ok(TagFamily::Tag16h5));
        assert!("36h10".parse::<TagFamily>().is_err());
    }

    #[test]
    fn unknown_name_falls_back_to_16h5() {
        let choice = TagFamily::resolve("aruco4x4");
        assert_eq!(choice.family, TagFamily::Tag16h5);
        assert!(choice.fell_back());
        assert_eq!(choice.rejected.as_deref(), Some("aruco4x4"));

        let ok = TagFamily::resolve("25h7");
        assert_eq!(ok.family, TagFamily::Tag25h7);
        assert!(!ok.fell_back());
    }

    #[test]
    fn display_round_trips() {
        for f in TagFamily::ALL {
            assert_eq!(f.to_string().parse::<TagFamily>(), Ok(f));
        }
    }
}
