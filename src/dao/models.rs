use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::vote::VoteValue;

/// Vote record as kept in the vote log and echoed by the votes API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct VoteRecord {
    /// `vote-<unix millis>` identifier.
    pub id: String,
    /// Voter, when known.
    pub user_id: Option<String>,
    /// Song the vote applies to, as displayed to the voter.
    pub song: String,
    /// 0 for thumbs down, 1 for thumbs up.
    pub vote_value: VoteValue,
    /// RFC 3339 timestamp of the submission.
    pub vote_time: String,
    /// NFC tag that triggered the vote, if any.
    pub nfctagid: Option<String>,
}

/// Credentials issued by the hosted auth service after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    /// Bearer token acting as the user against the hosted store.
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Identifier of the signed-in user.
    pub user_id: String,
    pub email: Option<String>,
    /// Guest account created without credentials.
    pub is_anonymous: bool,
}

/// Identity resolved from a bearer token.
///
/// Carries the caller's own token so store queries run under the caller's identity and
/// row-level security applies to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub is_anonymous: bool,
}

/// Opaque user profile row as returned by the store.
pub type ProfileRow = serde_json::Value;
