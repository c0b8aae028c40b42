use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::VoteRecord,
    dto::{
        validation::{validate_nfc_tag_id, validate_song_title},
        voter::VoterStats,
    },
    state::vote::VoteValue,
};

/// Query accepted by `GET /vote`.
///
/// `voteValue` stays a raw string: anything but `"0"`/`"1"` is ignored rather than rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VotePageQuery {
    /// Vote to cast immediately, `"0"` or `"1"`.
    #[serde(rename = "voteValue")]
    pub vote_value: Option<String>,
    /// NFC tag that opened the page.
    pub nfctagid: Option<String>,
    /// Viewport width in CSS pixels when no client hint header is sent.
    pub width: Option<u32>,
}

/// Thumbs button press on the vote page.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualVoteRequest {
    pub vote_value: VoteValue,
}

/// Render model of the vote page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VotePageView {
    pub title: String,
    /// Song being voted on (the default song while loading).
    pub current_song: String,
    pub loading: bool,
    /// A vote is in flight; inputs are disabled.
    pub submitting: bool,
    pub has_voted: bool,
    pub selected_vote: Option<VoteValue>,
    pub is_mobile: bool,
    /// Thumbs buttons are only rendered on desktop viewports.
    pub show_vote_buttons: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_message: Option<String>,
    /// Last recognised tag, shown on mobile only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfc_status: Option<String>,
    /// Seconds before this voter may vote again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_time: Option<u64>,
}

/// What the confirmation page button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Clear the vote and go back to voting.
    Back,
    /// Send the visitor to the login page.
    Login,
}

/// Button rendered on the confirmation page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmationAction {
    pub kind: ActionKind,
    pub label: String,
    pub method: String,
    pub href: String,
}

impl ConfirmationAction {
    pub fn for_session(logged_in: bool) -> Self {
        if logged_in {
            Self {
                kind: ActionKind::Back,
                label: "Back to Voting".into(),
                method: "POST".into(),
                href: "/vote/return".into(),
            }
        } else {
            Self {
                kind: ActionKind::Login,
                label: "Sign up or login to see progress".into(),
                method: "GET".into(),
                href: "/login".into(),
            }
        }
    }
}

/// Render model of the confirmation page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmationView {
    pub vote_value: VoteValue,
    pub positive: bool,
    pub title: String,
    pub song: String,
    pub logged_in: bool,
    pub action: ConfirmationAction,
    /// Progress of the signed-in voter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter: Option<VoterStats>,
}

impl ConfirmationView {
    pub fn new(vote_value: VoteValue, song: String, logged_in: bool) -> Self {
        let positive = vote_value.is_positive();
        let title = if positive {
            "You voted positively for this sound"
        } else {
            "You voted negatively for this sound"
        };
        Self {
            vote_value,
            positive,
            title: title.into(),
            song,
            logged_in,
            action: ConfirmationAction::for_session(logged_in),
            voter: None,
        }
    }

    pub fn with_voter(mut self, voter: Option<VoterStats>) -> Self {
        self.voter = voter;
        self
    }
}

/// Body of `POST /api/votes`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VoteSubmissionRequest {
    #[validate(length(min = 1, max = 200), custom(function = validate_song_title))]
    pub song: String,
    pub vote_value: VoteValue,
    #[validate(custom(function = validate_nfc_tag_id))]
    pub nfctagid: Option<String>,
}

impl From<&VoteRecord> for VoteSubmissionRequest {
    fn from(vote: &VoteRecord) -> Self {
        Self {
            song: vote.song.clone(),
            vote_value: vote.vote_value,
            nfctagid: vote.nfctagid.clone(),
        }
    }
}

/// Response of the votes endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub data: VoteRecord,
}

impl SubmissionResponse {
    pub fn recorded(vote: VoteRecord) -> Self {
        Self {
            success: true,
            message: "Vote recorded successfully".into(),
            data: vote,
        }
    }
}

/// Per-song vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TallyEntry {
    pub song: String,
    pub positive: u64,
    pub negative: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_copy_follows_vote_and_login() {
        let view = ConfirmationView::new(VoteValue::DOWN, "Ocean Waves".into(), false);
        assert!(!view.positive);
        assert_eq!(view.title, "You voted negatively for this sound");
        assert_eq!(view.action.kind, ActionKind::Login);
        assert_eq!(view.action.href, "/login");

        let view = ConfirmationView::new(VoteValue::UP, "Ocean Waves".into(), true);
        assert_eq!(view.title, "You voted positively for this sound");
        assert_eq!(view.action.label, "Back to Voting");
    }

    #[test]
    fn submission_request_rejects_blank_song_and_bad_tag() {
        let request: VoteSubmissionRequest = serde_json::from_value(serde_json::json!({
            "song": "  ",
            "vote_value": 1,
            "nfctagid": "tag with spaces"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("song"));
        assert!(fields.contains_key("nfctagid"));
    }

    #[test]
    fn submission_request_rejects_out_of_range_vote() {
        let parsed = serde_json::from_value::<VoteSubmissionRequest>(serde_json::json!({
            "song": "Ocean Waves",
            "vote_value": 2,
            "nfctagid": null
        }));
        assert!(parsed.is_err());
    }
}
