//! The fixed read/write/delete permission mask.
//!
//! Internally a 3-bit value; on the wire a string of the letters `r`,
//! `w` and `d`, each optional and non-repeating, in any order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionsError {
    #[error("invalid permissions: unknown letter '{0}'")]
    UnknownLetter(char),

    #[error("invalid permissions: letter '{0}' repeated")]
    Repeated(char),
}

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const READ: Permissions = Permissions(0b001);
    pub const WRITE: Permissions = Permissions(0b010);
    pub const DELETE: Permissions = Permissions(0b100);
    pub const ALL: Permissions = Permissions(0b111);

    const LETTERS: [(char, Permissions); 3] = [
        ('r', Permissions::READ),
        ('w', Permissions::WRITE),
        ('d', Permissions::DELETE),
    ];

    /// True when every bit of `required` is present in `self`.
    pub fn contains(self, required: Permissions) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn from_letter(letter: char) -> Option<Permissions> {
        Self::LETTERS
            .iter()
            .find(|(c, _)| *c == letter)
            .map(|(_, p)| *p)
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl FromStr for Permissions {
    type Err = PermissionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = Permissions::NONE;
        for letter in s.chars() {
            let bit = Self::from_letter(letter).ok_or(PermissionsError::UnknownLetter(letter))?;
            if mask.contains(bit) {
                return Err(PermissionsError::Repeated(letter));
            }
            mask = mask | bit;
        }
        Ok(mask)
    }
}

/// Canonical `rwd` ordering.
impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, bit) in Self::LETTERS {
            if self.contains(bit) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permissions(\"{self}\")")
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
