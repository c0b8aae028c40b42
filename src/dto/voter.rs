//! Voter progress shown after a vote, plus the favourite-song payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_song_title;

/// Votes needed for the second badge tier.
const SECOND_TIER: u64 = 100;
/// Votes needed for the third badge tier.
const THIRD_TIER: u64 = 500;

/// Badge earned by voting on the same song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum LocalBadge {
    Floating,
    Settling,
    Resting,
}

impl LocalBadge {
    pub fn for_votes(votes: u64) -> Self {
        match votes {
            v if v < SECOND_TIER => Self::Floating,
            v if v < THIRD_TIER => Self::Settling,
            _ => Self::Resting,
        }
    }
}

/// Badge earned by voting overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum GlobalBadge {
    Kindled,
    Burning,
    Embered,
}

impl GlobalBadge {
    pub fn for_votes(votes: u64) -> Self {
        match votes {
            v if v < SECOND_TIER => Self::Kindled,
            v if v < THIRD_TIER => Self::Burning,
            _ => Self::Embered,
        }
    }
}

/// Progress of a signed-in voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VoterStats {
    /// Every vote the voter has cast.
    pub total_votes: u64,
    /// Votes the voter has cast on the song just voted for.
    pub votes_here: u64,
    /// Seconds before the next vote is accepted, `0` when voting is open.
    pub waiting_time: u64,
    pub local_badge: LocalBadge,
    pub global_badge: GlobalBadge,
    /// Guest account without credentials.
    pub is_anonymous: bool,
    /// The voter marked this song as a favourite.
    pub favorite: bool,
}

impl VoterStats {
    pub fn new(
        total_votes: u64,
        votes_here: u64,
        waiting_time: u64,
        is_anonymous: bool,
        favorite: bool,
    ) -> Self {
        Self {
            total_votes,
            votes_here,
            waiting_time,
            local_badge: LocalBadge::for_votes(votes_here),
            global_badge: GlobalBadge::for_votes(total_votes),
            is_anonymous,
            favorite,
        }
    }
}

/// Body of `POST /api/favorites`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FavoriteRequest {
    #[validate(length(min = 1, max = 200), custom(function = validate_song_title))]
    pub song: String,
    /// Desired state; omitted flips the current one.
    pub liked: Option<bool>,
}

/// Favourite flag of one song after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FavoriteView {
    pub song: String,
    pub liked: bool,
}
