use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// A thumbs vote: `1` is positive, `0` is negative. No other value can be built.
///
/// Serialized as a plain integer in the range `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "u8", into = "u8")]
#[schema(value_type = u8)]
pub struct VoteValue(u8);

/// Raised when a value outside `{0, 1}` is offered as a vote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("vote value must be 0 or 1, got `{0}`")]
pub struct InvalidVoteValue(pub String);

impl VoteValue {
    /// Thumbs up.
    pub const UP: VoteValue = VoteValue(1);
    /// Thumbs down.
    pub const DOWN: VoteValue = VoteValue(0);

    /// True for a thumbs up.
    pub fn is_positive(self) -> bool {
        self == Self::UP
    }

    /// Raw numeric value.
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for VoteValue {
    type Error = InvalidVoteValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 | 1 => Ok(Self(value)),
            other => Err(InvalidVoteValue(other.to_string())),
        }
    }
}

impl From<VoteValue> for u8 {
    fn from(value: VoteValue) -> Self {
        value.0
    }
}

/// Only the literal strings `"0"` and `"1"` parse; `"01"`, `" 1"` or `"1.0"` do not.
impl FromStr for VoteValue {
    type Err = InvalidVoteValue;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "0" => Ok(Self::DOWN),
            "1" => Ok(Self::UP),
            other => Err(InvalidVoteValue(other.to_string())),
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
