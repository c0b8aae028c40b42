use tracing::{debug, warn};

use crate::{
    dto::vote::ConfirmationView,
    services::{auth_service, voter_service},
    state::{SessionId, SharedState, vote::VoteValue},
};

/// Result of the confirmation page gate.
#[derive(Debug)]
pub enum ConfirmationOutcome {
    Render(ConfirmationView),
    /// Invalid parameter or no matching vote in this session: back to the vote page.
    RedirectToVote,
}

/// Where the confirmation button leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTarget {
    Vote,
    Login,
}

/// Gate and render the confirmation page for `raw_vote`.
pub async fn open(state: &SharedState, session: SessionId, raw_vote: &str) -> ConfirmationOutcome {
    let Ok(vote) = raw_vote.parse::<VoteValue>() else {
        debug!(session = %session, vote = raw_vote, "confirmation rejected: bad vote value");
        return ConfirmationOutcome::RedirectToVote;
    };
    let Some(flags) = state
        .sessions()
        .vote_flags(session)
        .filter(|flags| flags.vote_value == vote)
    else {
        debug!(session = %session, vote = raw_vote, "confirmation rejected: no matching vote");
        return ConfirmationOutcome::RedirectToVote;
    };

    let user = auth_service::signed_in_user(state, session).await;
    let song = state
        .sessions()
        .take_navigation(session)
        .filter(|navigation| navigation.vote_value == vote)
        .map(|navigation| navigation.song)
        .into_iter()
        .chain(Some(flags.song))
        .find(|song| !song.is_empty())
        .unwrap_or_else(|| state.config().default_song.clone());

    let voter = match &user {
        Some(user) => match voter_service::stats(state, user, &song).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!(session = %session, error = %err, "voter stats unavailable");
                None
            }
        },
        None => None,
    };

    ConfirmationOutcome::Render(
        ConfirmationView::new(vote, song, user.is_some()).with_voter(voter),
    )
}

/// Signed-in visitors go back to voting with a clean slate; others are sent to log in.
pub async fn return_action(state: &SharedState, session: SessionId) -> ReturnTarget {
    if auth_service::is_logged_in(state, session).await {
        state.sessions().clear_vote(session);
        ReturnTarget::Vote
    } else {
        ReturnTarget::Login
    }
}
