use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::{
        validation::validate_nfc_tag_id,
        vote::{VotePageQuery, VotePageView},
    },
    error::ServiceError,
    services::{now_playing, submission::new_vote_record},
    state::{
        SessionId, SharedState,
        session::{NavigationState, VoteFlags},
        vote::VoteValue,
        vote_page::{VotePage, VotePageError, VotePageEvent},
    },
};

/// Tag id recorded for votes cast through the `voteValue` query parameter.
pub const DIRECT_URL_TAG: &str = "direct-url";
/// Voter id used when the session is not signed in.
const ANONYMOUS_USER_ID: &str = "dummy-user-id";
const PAGE_TITLE: &str = "Welcome to Sound Guys";

/// Result of opening the vote page.
#[derive(Debug)]
pub enum VotePageOutcome {
    /// Nothing to submit; show the page.
    Render(VotePageView),
    /// A vote from the URL was recorded; continue to its confirmation.
    Voted(VoteValue),
}

/// Vote requested through the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoVote {
    pub vote: VoteValue,
    pub nfctagid: String,
    /// The vote comes from a registered NFC tag rather than `voteValue`.
    pub from_tag: bool,
}

/// A registered tag wins over `voteValue`; unknown tags and any other value are ignored.
///
/// Tag ids that are not well-formed count as absent.
pub fn detect_auto_vote(config: &AppConfig, query: &VotePageQuery) -> Option<AutoVote> {
    let tag = query
        .nfctagid
        .as_deref()
        .filter(|tag| validate_nfc_tag_id(tag).is_ok());

    if let Some(tag) = tag {
        if let Some(vote) = config.vote_for_tag(tag) {
            return Some(AutoVote {
                vote,
                nfctagid: tag.to_string(),
                from_tag: true,
            });
        }
    }

    let vote = query.vote_value.as_deref()?.parse::<VoteValue>().ok()?;
    Some(AutoVote {
        vote,
        nfctagid: tag.unwrap_or(DIRECT_URL_TAG).to_string(),
        from_tag: false,
    })
}

/// Throttle key of the session: the signed-in user, else the session itself.
fn voter_key(state: &SharedState, session: SessionId) -> String {
    state
        .sessions()
        .auth_tokens(session)
        .map(|tokens| tokens.user_id)
        .unwrap_or_else(|| session.to_string())
}

/// Vote accepted by the page state machine and waiting to be recorded.
#[derive(Debug)]
struct PlannedVote {
    page_id: Uuid,
    vote: VoteValue,
    song: String,
    nfctagid: Option<String>,
    /// Holder of the vote slot claimed for this submission.
    voter: String,
    claimed_at: Instant,
}

/// Load (or resume) the session's vote page and auto-submit a vote carried by the URL.
pub async fn open_page(
    state: &SharedState,
    session: SessionId,
    query: VotePageQuery,
    viewport_width: Option<u32>,
) -> Result<VotePageOutcome, ServiceError> {
    let config = state.config();
    let is_mobile = viewport_width.is_some_and(|width| config.is_mobile_width(width));

    let (page_id, needs_song) = state.sessions().with_page(session, |slot| {
        let now = Instant::now();
        let reusable = slot
            .as_ref()
            .is_some_and(|page| !page.has_voted() && !page.is_stale(now, config.submission_timeout));
        if !reusable {
            if slot.as_ref().is_some_and(VotePage::is_submitting) {
                warn!(session = %session, "abandoning stale vote submission");
            }
            *slot = None;
        }

        let page = slot.get_or_insert_with(|| VotePage::new(is_mobile));
        page.set_mobile(is_mobile);
        (page.id(), page.is_loading())
    });

    if needs_song {
        let song = now_playing::load_song(config).await;
        state.sessions().with_page(session, |slot| {
            if let Some(page) = slot
                .as_mut()
                .filter(|page| page.id() == page_id && page.is_loading())
            {
                if let Err(err) = page.apply(VotePageEvent::SongLoaded(song)) {
                    debug!(error = %err, "song load ignored");
                }
            }
        });
    }

    if let Some(auto) = detect_auto_vote(config, &query) {
        if auto.from_tag {
            state.sessions().with_page(session, |slot| {
                if let Some(page) = slot.as_mut() {
                    page.detect_tag(auto.nfctagid.clone());
                }
            });
            info!(session = %session, nfctagid = %auto.nfctagid, vote_value = %auto.vote, "NFC tag detected");
        }

        match plan_submission(state, session, Some(page_id), auto.vote, Some(auto.nfctagid)) {
            Ok(plan) => {
                let vote = complete_submission(state, session, plan).await?;
                return Ok(VotePageOutcome::Voted(vote));
            }
            Err(ServiceError::Throttled { waiting_time }) => {
                info!(session = %session, waiting_time, "auto vote refused: voted too recently");
            }
            Err(err) => debug!(session = %session, error = %err, "auto vote not accepted"),
        }
    }

    Ok(VotePageOutcome::Render(page_view(state, session, is_mobile)))
}

/// Thumbs button press for the session's current page.
pub async fn submit_manual(
    state: &SharedState,
    session: SessionId,
    vote: VoteValue,
) -> Result<VoteValue, ServiceError> {
    let plan = plan_submission(state, session, None, vote, None)?;
    complete_submission(state, session, plan).await
}

/// Current render model of the session's page.
pub fn page_view(state: &SharedState, session: SessionId, is_mobile: bool) -> VotePageView {
    let page = state
        .sessions()
        .page(session)
        .unwrap_or_else(|| VotePage::new(is_mobile));
    let waiting_time = state.vote_wait(&voter_key(state, session), Instant::now());
    render(&page, state.config(), waiting_time)
}

fn render(page: &VotePage, config: &AppConfig, waiting_time: Option<u64>) -> VotePageView {
    let is_mobile = page.is_mobile();
    VotePageView {
        title: PAGE_TITLE.to_string(),
        current_song: page.current_song(&config.default_song).to_string(),
        loading: page.is_loading(),
        submitting: page.is_submitting(),
        has_voted: page.has_voted(),
        selected_vote: page.selected_vote(),
        is_mobile,
        show_vote_buttons: !is_mobile,
        rating_prompt: (!is_mobile).then(|| "Rate the song that's playing now".to_string()),
        mobile_message: is_mobile.then(|| "Use NFC stickers to vote".to_string()),
        nfc_status: page
            .nfc_tag_detected()
            .filter(|_| is_mobile)
            .map(|tag| format!("NFC Tag {tag} detected")),
        waiting_time,
    }
}

/// Move the page to `Submitting`. This is the in-flight guard: only a `Ready` page accepts.
///
/// A page that could accept the vote also claims the voter's slot, so a voter who voted
/// within the throttle period is refused with the seconds left.
fn plan_submission(
    state: &SharedState,
    session: SessionId,
    expected: Option<Uuid>,
    vote: VoteValue,
    nfctagid: Option<String>,
) -> Result<PlannedVote, ServiceError> {
    let default_song = &state.config().default_song;
    let voter = voter_key(state, session);
    let claimed_at = Instant::now();

    state
        .sessions()
        .with_page(session, |slot| -> Result<PlannedVote, ServiceError> {
            let page = slot
                .as_mut()
                .ok_or_else(|| ServiceError::InvalidState("the vote page is not open".into()))?;
            if expected.is_some_and(|id| id != page.id()) {
                return Err(VotePageError::InstanceMismatch.into());
            }

            if page.accepts_votes() {
                state
                    .claim_vote_slot(&voter, claimed_at)
                    .map_err(|waiting_time| ServiceError::Throttled { waiting_time })?;
            }
            page.apply(VotePageEvent::Submit {
                vote,
                nfctagid: nfctagid.clone(),
            })
            .map_err(VotePageError::from)?;

            Ok(PlannedVote {
                page_id: page.id(),
                vote,
                song: page.current_song(default_song).to_string(),
                nfctagid,
                voter,
                claimed_at,
            })
        })
}

async fn complete_submission(
    state: &SharedState,
    session: SessionId,
    plan: PlannedVote,
) -> Result<VoteValue, ServiceError> {
    if let Err(err) = record_vote(state, session, &plan).await {
        state.release_vote_slot(&plan.voter, plan.claimed_at);
        state.sessions().with_page(session, |slot| {
            if let Some(page) = slot.as_mut().filter(|page| page.id() == plan.page_id) {
                if let Err(transition) = page.apply(VotePageEvent::SubmissionFailed) {
                    debug!(error = %transition, "submission abort ignored");
                }
            }
        });
        warn!(session = %session, error = %err, "vote submission failed");
        return Err(err);
    }

    let finished = state
        .sessions()
        .with_page(session, |slot| -> Result<(), VotePageError> {
            let page = slot
                .as_mut()
                .filter(|page| page.id() == plan.page_id)
                .ok_or(VotePageError::InstanceMismatch)?;
            page.apply(VotePageEvent::SubmissionCompleted)?;
            Ok(())
        });
    if let Err(err) = finished {
        warn!(session = %session, error = %err, "vote recorded after its page was replaced");
    }

    Ok(plan.vote)
}

async fn record_vote(
    state: &SharedState,
    session: SessionId,
    plan: &PlannedVote,
) -> Result<(), ServiceError> {
    sleep(state.config().submission_delay).await;

    let user_id = state
        .sessions()
        .auth_tokens(session)
        .map(|tokens| tokens.user_id)
        .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string());
    let vote = new_vote_record(
        plan.song.clone(),
        plan.vote,
        Some(user_id),
        plan.nfctagid.clone(),
    );

    let response = state.submitter().submit(vote).await?;
    let vote = response.data;
    let logged = state.vote_log().append(vote.clone()).await?;
    info!(
        session = %session,
        vote_id = %vote.id,
        song = %vote.song,
        vote_value = %vote.vote_value,
        nfctagid = ?vote.nfctagid,
        logged,
        "vote recorded"
    );

    state.sessions().record_vote(
        session,
        VoteFlags {
            vote_value: plan.vote,
            song: plan.song.clone(),
        },
        NavigationState {
            song: plan.song.clone(),
            vote_value: plan.vote,
            nfctagid: plan.nfctagid.clone(),
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::{
            models::VoteRecord,
            models::AuthTokens,
            vote_log::MemoryVoteLog,
        },
        dto::vote::SubmissionResponse,
        services::submission::VoteSubmitter,
        state::AppState,
    };

    fn ocean_waves_config() -> AppConfig {
        AppConfig {
            songs: vec!["Ocean Waves".into()],
            ..AppConfig::default()
        }
        .without_delays()
    }

    fn query(vote_value: Option<&str>, nfctagid: Option<&str>) -> VotePageQuery {
        VotePageQuery {
            vote_value: vote_value.map(String::from),
            nfctagid: nfctagid.map(String::from),
            width: None,
        }
    }

    fn new_session(state: &SharedState) -> SessionId {
        state.sessions().resume_or_create(None).0
    }

    async fn logged_votes(state: &SharedState) -> Vec<VoteRecord> {
        state.vote_log().list().await.unwrap()
    }

    struct FailingSubmitter;

    impl VoteSubmitter for FailingSubmitter {
        fn submit(
            &self,
            _vote: VoteRecord,
        ) -> BoxFuture<'static, Result<SubmissionResponse, ServiceError>> {
            Box::pin(async { Err(ServiceError::Internal("votes endpoint down".into())) })
        }
    }

    #[test]
    fn registered_tag_wins_over_vote_value() {
        let config = AppConfig::default();
        let auto = detect_auto_vote(&config, &query(Some("1"), Some("1234568"))).unwrap();
        assert_eq!(auto.vote, VoteValue::DOWN);
        assert!(auto.from_tag);
    }

    #[test]
    fn unknown_tag_and_odd_values_are_ignored() {
        let config = AppConfig::default();
        assert_eq!(detect_auto_vote(&config, &query(None, Some("42"))), None);
        assert_eq!(detect_auto_vote(&config, &query(Some("2"), None)), None);
        assert_eq!(detect_auto_vote(&config, &query(Some("01"), None)), None);
        assert_eq!(detect_auto_vote(&config, &query(Some("true"), None)), None);
    }

    #[test]
    fn vote_value_uses_tag_or_direct_url_marker() {
        let config = AppConfig::default();
        let auto = detect_auto_vote(&config, &query(Some("1"), None)).unwrap();
        assert_eq!(auto.nfctagid, DIRECT_URL_TAG);

        let auto = detect_auto_vote(&config, &query(Some("0"), Some("999"))).unwrap();
        assert_eq!(auto.vote, VoteValue::DOWN);
        assert_eq!(auto.nfctagid, "999");
        assert!(!auto.from_tag);
    }

    #[test]
    fn malformed_tags_count_as_absent() {
        let config = AppConfig::default();
        let auto = detect_auto_vote(&config, &query(Some("1"), Some("bad tag!"))).unwrap();
        assert_eq!(auto.nfctagid, DIRECT_URL_TAG);

        let config = AppConfig {
            nfc_tags: [("bad tag".to_string(), VoteValue::UP)].into_iter().collect(),
            ..AppConfig::default()
        };
        assert_eq!(detect_auto_vote(&config, &query(None, Some("bad tag"))), None);
        assert_eq!(detect_auto_vote(&config, &query(None, Some(""))), None);
    }

    fn signed_in(state: &SharedState, session: SessionId, user_id: &str) {
        state.sessions().set_auth_tokens(
            session,
            AuthTokens {
                access_token: format!("token-{user_id}"),
                refresh_token: None,
                user_id: user_id.to_string(),
                email: None,
                is_anonymous: false,
            },
        );
    }

    #[tokio::test]
    async fn nfc_tag_votes_for_the_loaded_song() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);

        let outcome = open_page(&state, session, query(None, Some("1234568")), None)
            .await
            .unwrap();
        assert!(matches!(outcome, VotePageOutcome::Voted(vote) if vote == VoteValue::DOWN));

        assert_eq!(
            state.sessions().take_navigation(session),
            Some(NavigationState {
                song: "Ocean Waves".into(),
                vote_value: VoteValue::DOWN,
                nfctagid: Some("1234568".into()),
            })
        );
        let votes = logged_votes(&state).await;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].song, "Ocean Waves");
        assert_eq!(votes[0].user_id.as_deref(), Some("dummy-user-id"));
        assert!(state.sessions().page(session).unwrap().has_voted());
    }

    #[tokio::test]
    async fn nfc_and_manual_thumbs_up_are_equivalent() {
        let state = AppState::new(ocean_waves_config());
        let by_tag = new_session(&state);
        let by_hand = new_session(&state);

        open_page(&state, by_tag, query(None, Some("1234567")), None)
            .await
            .unwrap();
        open_page(&state, by_hand, VotePageQuery::default(), Some(1280))
            .await
            .unwrap();
        let vote = submit_manual(&state, by_hand, VoteValue::UP).await.unwrap();
        assert_eq!(vote, VoteValue::UP);

        assert_eq!(
            state.sessions().vote_flags(by_tag),
            state.sessions().vote_flags(by_hand)
        );
        let votes = logged_votes(&state).await;
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].vote_value, votes[1].vote_value);
        assert_eq!(votes[0].song, votes[1].song);
    }

    #[tokio::test]
    async fn unmapped_tag_just_renders_the_page() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);

        let outcome = open_page(&state, session, query(None, Some("0000000")), Some(400))
            .await
            .unwrap();
        let VotePageOutcome::Render(view) = outcome else {
            panic!("unexpected auto vote");
        };
        assert_eq!(view.current_song, "Ocean Waves");
        assert!(!view.loading);
        assert_eq!(view.nfc_status, None);
        assert!(logged_votes(&state).await.is_empty());
    }

    #[tokio::test]
    async fn layout_follows_viewport_width() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);

        let VotePageOutcome::Render(mobile) =
            open_page(&state, session, VotePageQuery::default(), Some(768))
                .await
                .unwrap()
        else {
            panic!("unexpected auto vote");
        };
        assert!(mobile.is_mobile);
        assert!(!mobile.show_vote_buttons);
        assert_eq!(mobile.mobile_message.as_deref(), Some("Use NFC stickers to vote"));
        assert_eq!(mobile.rating_prompt, None);

        let VotePageOutcome::Render(desktop) =
            open_page(&state, session, VotePageQuery::default(), Some(769))
                .await
                .unwrap()
        else {
            panic!("unexpected auto vote");
        };
        assert!(desktop.show_vote_buttons);
        assert_eq!(desktop.mobile_message, None);
        assert!(desktop.rating_prompt.is_some());
    }

    #[tokio::test]
    async fn in_flight_vote_blocks_url_vote() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);
        open_page(&state, session, VotePageQuery::default(), None)
            .await
            .unwrap();
        plan_submission(&state, session, None, VoteValue::DOWN, None).unwrap();

        let outcome = open_page(&state, session, query(Some("1"), None), None)
            .await
            .unwrap();
        let VotePageOutcome::Render(view) = outcome else {
            panic!("second vote must not start");
        };
        assert!(view.submitting);
        assert_eq!(view.selected_vote, Some(VoteValue::DOWN));

        let err = submit_manual(&state, session, VoteValue::UP).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn mobile_page_reports_the_tag_while_submitting() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);
        open_page(&state, session, VotePageQuery::default(), Some(375))
            .await
            .unwrap();
        plan_submission(&state, session, None, VoteValue::DOWN, None).unwrap();

        let outcome = open_page(&state, session, query(None, Some("1234567")), Some(375))
            .await
            .unwrap();
        let VotePageOutcome::Render(view) = outcome else {
            panic!("second vote must not start");
        };
        assert!(view.is_mobile);
        assert!(view.submitting);
        assert_eq!(view.nfc_status.as_deref(), Some("NFC Tag 1234567 detected"));
        assert!(logged_votes(&state).await.is_empty());
    }

    #[tokio::test]
    async fn second_scan_inside_the_period_is_refused() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);

        let first = open_page(&state, session, query(None, Some("1234567")), Some(375))
            .await
            .unwrap();
        assert!(matches!(first, VotePageOutcome::Voted(_)));

        let second = open_page(&state, session, query(None, Some("1234568")), Some(375))
            .await
            .unwrap();
        let VotePageOutcome::Render(view) = second else {
            panic!("the second scan must be throttled");
        };
        assert!(view.waiting_time.is_some_and(|secs| (1..=60).contains(&secs)));
        assert!(!view.submitting);
        assert_eq!(logged_votes(&state).await.len(), 1);

        let err = submit_manual(&state, session, VoteValue::UP).await.unwrap_err();
        assert!(matches!(err, ServiceError::Throttled { .. }));
        assert!(state.sessions().page(session).unwrap().accepts_votes());
    }

    #[tokio::test]
    async fn signed_in_voter_is_throttled_across_sessions() {
        let state = AppState::new(ocean_waves_config());
        let phone = new_session(&state);
        let laptop = new_session(&state);
        signed_in(&state, phone, "user-alice");
        signed_in(&state, laptop, "user-alice");

        open_page(&state, phone, query(Some("1"), None), None)
            .await
            .unwrap();
        let outcome = open_page(&state, laptop, query(Some("0"), None), None)
            .await
            .unwrap();
        assert!(matches!(outcome, VotePageOutcome::Render(view) if view.waiting_time.is_some()));

        let votes = logged_votes(&state).await;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].user_id.as_deref(), Some("user-alice"));
    }

    #[tokio::test]
    async fn manual_vote_needs_an_open_page() {
        let state = AppState::new(ocean_waves_config());
        let session = new_session(&state);
        let err = submit_manual(&state, session, VoteValue::UP).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn failed_submission_reenables_the_page() {
        let state = AppState::with_components(
            ocean_waves_config(),
            Arc::new(MemoryVoteLog::new()),
            Arc::new(FailingSubmitter),
        );
        let session = new_session(&state);

        let err = open_page(&state, session, query(Some("1"), None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        let page = state.sessions().page(session).unwrap();
        assert!(page.accepts_votes());
        assert_eq!(state.sessions().vote_flags(session), None);
        assert!(logged_votes(&state).await.is_empty());
        assert_eq!(state.vote_wait(&session.to_string(), Instant::now()), None);
    }
}
