use std::{fmt, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::state::vote::VoteValue;

/// Lifecycle of one vote page instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotePhase {
    /// Waiting for the now-playing song; no vote can be cast yet.
    LoadingSong,
    /// Song known, controls enabled.
    Ready,
    /// A vote was accepted and is being recorded; further input is disabled.
    Submitting(PendingVote),
    /// The vote was recorded; the instance is finished.
    Voted(VoteValue),
}

/// Vote currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    /// Value being submitted.
    pub vote: VoteValue,
    /// Tag that triggered the vote, or the `direct-url` marker.
    pub nfctagid: Option<String>,
    /// When the submission started.
    pub since: Instant,
}

/// Events that drive the vote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotePageEvent {
    /// The now-playing loader produced a song.
    SongLoaded(String),
    /// A thumbs button, NFC tag or URL parameter asked to vote.
    Submit {
        /// Requested value.
        vote: VoteValue,
        /// Origin tag, if any.
        nfctagid: Option<String>,
    },
    /// Recording the vote failed; controls are re-enabled.
    SubmissionFailed,
    /// Recording the vote succeeded.
    SubmissionCompleted,
}

/// Error returned when an event does not apply to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid vote page transition: cannot {event} while {from}")]
pub struct InvalidTransition {
    /// Phase the page was in.
    pub from: VotePhase,
    /// Rejected event.
    pub event: VotePageEvent,
}

/// Errors raised while driving a page instance stored in a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotePageError {
    /// Event not valid in the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The session now holds a different page instance.
    #[error("vote page instance was replaced")]
    InstanceMismatch,
}

impl fmt::Display for VotePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VotePhase::LoadingSong => f.write_str("the song is loading"),
            VotePhase::Ready => f.write_str("ready"),
            VotePhase::Submitting(_) => f.write_str("a vote is being submitted"),
            VotePhase::Voted(_) => f.write_str("the vote is already recorded"),
        }
    }
}

impl fmt::Display for VotePageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VotePageEvent::SongLoaded(_) => f.write_str("load a song"),
            VotePageEvent::Submit { .. } => f.write_str("submit a vote"),
            VotePageEvent::SubmissionFailed => f.write_str("fail a submission"),
            VotePageEvent::SubmissionCompleted => f.write_str("complete a submission"),
        }
    }
}

/// One life of the vote page within a client session.
#[derive(Debug, Clone)]
pub struct VotePage {
    id: Uuid,
    phase: VotePhase,
    song: Option<String>,
    nfc_tag_detected: Option<String>,
    is_mobile: bool,
}

impl VotePage {
    /// Fresh instance waiting for its song.
    pub fn new(is_mobile: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: VotePhase::LoadingSong,
            song: None,
            nfc_tag_detected: None,
            is_mobile,
        }
    }

    /// Identifier distinguishing this instance from later reloads.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> &VotePhase {
        &self.phase
    }

    /// Loaded song, `None` while loading.
    pub fn song(&self) -> Option<&str> {
        self.song.as_deref()
    }

    /// Song to display, using `fallback` until the load completes.
    pub fn current_song<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.song.as_deref().unwrap_or(fallback)
    }

    /// Vote chosen on this page, once one was submitted.
    pub fn selected_vote(&self) -> Option<VoteValue> {
        match &self.phase {
            VotePhase::Submitting(pending) => Some(pending.vote),
            VotePhase::Voted(vote) => Some(*vote),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == VotePhase::LoadingSong
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, VotePhase::Submitting(_))
    }

    pub fn has_voted(&self) -> bool {
        matches!(self.phase, VotePhase::Voted(_))
    }

    /// True when a new vote may start right now.
    pub fn accepts_votes(&self) -> bool {
        self.phase == VotePhase::Ready
    }

    /// Whether the page renders the mobile layout.
    pub fn is_mobile(&self) -> bool {
        self.is_mobile
    }

    pub fn set_mobile(&mut self, is_mobile: bool) {
        self.is_mobile = is_mobile;
    }

    /// Last NFC tag recognised on this page.
    pub fn nfc_tag_detected(&self) -> Option<&str> {
        self.nfc_tag_detected.as_deref()
    }

    pub fn detect_tag(&mut self, tag_id: impl Into<String>) {
        self.nfc_tag_detected = Some(tag_id.into());
    }

    /// A submission that has been running longer than `timeout` was abandoned by its request.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        match &self.phase {
            VotePhase::Submitting(pending) => now.duration_since(pending.since) > timeout,
            _ => false,
        }
    }

    /// Apply an event, returning the phase reached.
    pub fn apply(&mut self, event: VotePageEvent) -> Result<&VotePhase, InvalidTransition> {
        let next = match (&self.phase, &event) {
            (VotePhase::LoadingSong, VotePageEvent::SongLoaded(song)) => {
                self.song = Some(song.clone());
                Some(VotePhase::Ready)
            }
            (VotePhase::Ready, VotePageEvent::Submit { vote, nfctagid }) => {
                Some(VotePhase::Submitting(PendingVote {
                    vote: *vote,
                    nfctagid: nfctagid.clone(),
                    since: Instant::now(),
                }))
            }
            (VotePhase::Submitting(_), VotePageEvent::SubmissionFailed) => Some(VotePhase::Ready),
            (VotePhase::Submitting(pending), VotePageEvent::SubmissionCompleted) => {
                Some(VotePhase::Voted(pending.vote))
            }
            _ => None,
        };

        let Some(next) = next else {
            return Err(InvalidTransition {
                from: self.phase.clone(),
                event,
            });
        };

        self.phase = next;
        Ok(&self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_page(song: &str) -> VotePage {
        let mut page = VotePage::new(false);
        page.apply(VotePageEvent::SongLoaded(song.into())).unwrap();
        page
    }

    #[test]
    fn new_page_waits_for_song() {
        let page = VotePage::new(true);
        assert!(page.is_loading());
        assert!(!page.accepts_votes());
        assert_eq!(page.current_song("Frog Noises"), "Frog Noises");
        assert_eq!(page.selected_vote(), None);
    }

    #[test]
    fn happy_path_records_selected_vote() {
        let mut page = ready_page("Ocean Waves");
        assert_eq!(page.song(), Some("Ocean Waves"));

        page.apply(VotePageEvent::Submit {
            vote: VoteValue::UP,
            nfctagid: Some("1234567".into()),
        })
        .unwrap();
        assert!(page.is_submitting());
        assert_eq!(page.selected_vote(), Some(VoteValue::UP));

        let phase = page.apply(VotePageEvent::SubmissionCompleted).unwrap();
        assert_eq!(phase, &VotePhase::Voted(VoteValue::UP));
        assert!(page.has_voted());
    }

    #[test]
    fn vote_before_song_is_rejected() {
        let mut page = VotePage::new(false);
        let err = page
            .apply(VotePageEvent::Submit {
                vote: VoteValue::DOWN,
                nfctagid: None,
            })
            .unwrap_err();
        assert_eq!(err.from, VotePhase::LoadingSong);
    }

    #[test]
    fn only_one_vote_in_flight() {
        let mut page = ready_page("Rain Sounds");
        page.apply(VotePageEvent::Submit {
            vote: VoteValue::DOWN,
            nfctagid: None,
        })
        .unwrap();

        let err = page
            .apply(VotePageEvent::Submit {
                vote: VoteValue::UP,
                nfctagid: None,
            })
            .unwrap_err();
        assert!(matches!(err.from, VotePhase::Submitting(_)));
        assert_eq!(page.selected_vote(), Some(VoteValue::DOWN));
    }

    #[test]
    fn finished_page_accepts_nothing() {
        let mut page = ready_page("Rain Sounds");
        page.apply(VotePageEvent::Submit {
            vote: VoteValue::UP,
            nfctagid: None,
        })
        .unwrap();
        page.apply(VotePageEvent::SubmissionCompleted).unwrap();

        assert!(
            page.apply(VotePageEvent::Submit {
                vote: VoteValue::UP,
                nfctagid: None,
            })
            .is_err()
        );
        assert!(
            page.apply(VotePageEvent::SongLoaded("Ocean Waves".into()))
                .is_err()
        );
    }

    #[test]
    fn failed_submission_reenables_controls() {
        let mut page = ready_page("Forest Ambience");
        page.apply(VotePageEvent::Submit {
            vote: VoteValue::UP,
            nfctagid: None,
        })
        .unwrap();
        page.apply(VotePageEvent::SubmissionFailed).unwrap();
        assert!(page.accepts_votes());
        assert_eq!(page.selected_vote(), None);
    }

    #[test]
    fn staleness_only_applies_to_submissions() {
        let mut page = ready_page("Ocean Waves");
        let later = Instant::now() + Duration::from_secs(60);
        assert!(!page.is_stale(later, Duration::from_secs(10)));

        page.apply(VotePageEvent::Submit {
            vote: VoteValue::UP,
            nfctagid: None,
        })
        .unwrap();
        assert!(!page.is_stale(Instant::now(), Duration::from_secs(10)));
        assert!(page.is_stale(later, Duration::from_secs(10)));
    }

    #[test]
    fn error_message_names_phase_and_event() {
        let mut page = VotePage::new(false);
        let err = page.apply(VotePageEvent::SubmissionCompleted).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid vote page transition: cannot complete a submission while the song is loading"
        );
    }
}
