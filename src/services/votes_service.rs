use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::models::VoteRecord,
    dto::vote::{SubmissionResponse, TallyEntry, VoteSubmissionRequest},
    error::ServiceError,
    services::submission::new_vote_record,
    state::SharedState,
};

/// Record a vote posted to the API.
///
/// `caller` keys the throttle: one vote per caller per throttle period. A vote the log
/// fails to store gives the slot back.
pub async fn record(
    state: &SharedState,
    caller: &str,
    user_id: Option<String>,
    request: VoteSubmissionRequest,
) -> Result<SubmissionResponse, ServiceError> {
    request.validate()?;
    let claimed_at = Instant::now();
    state
        .claim_vote_slot(caller, claimed_at)
        .map_err(|waiting_time| ServiceError::Throttled { waiting_time })?;

    let vote = new_vote_record(request.song, request.vote_value, user_id, request.nfctagid);
    let logged = match state.vote_log().append(vote.clone()).await {
        Ok(logged) => logged,
        Err(err) => {
            state.release_vote_slot(caller, claimed_at);
            warn!(caller, error = %err, "api vote not stored");
            return Err(err.into());
        }
    };
    info!(
        caller,
        vote_id = %vote.id,
        song = %vote.song,
        vote_value = %vote.vote_value,
        logged,
        "api vote recorded"
    );

    Ok(SubmissionResponse::recorded(vote))
}

/// Every recorded vote, oldest first.
pub async fn list(state: &SharedState) -> Result<Vec<VoteRecord>, ServiceError> {
    Ok(state.vote_log().list().await?)
}

/// Per-song counts in the order songs were first voted on.
pub async fn tally(state: &SharedState) -> Result<Vec<TallyEntry>, ServiceError> {
    let votes = state.vote_log().list().await?;
    Ok(tally_votes(&votes))
}

fn tally_votes(votes: &[VoteRecord]) -> Vec<TallyEntry> {
    let mut counts: IndexMap<&str, (u64, u64)> = IndexMap::new();
    for vote in votes {
        let entry = counts.entry(vote.song.as_str()).or_default();
        if vote.vote_value.is_positive() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(song, (positive, negative))| TallyEntry {
            song: song.to_string(),
            positive,
            negative,
            total: positive + negative,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            storage::{StorageError, StorageResult},
            vote_log::{MemoryVoteLog, VoteLog},
        },
        services::submission::MockVoteSubmitter,
        state::{AppState, vote::VoteValue},
    };

    /// Vote log that refuses writes until `recover` is called.
    #[derive(Default)]
    struct FlakyVoteLog {
        healthy: AtomicBool,
        inner: MemoryVoteLog,
    }

    impl FlakyVoteLog {
        fn recover(&self) {
            self.healthy.store(true, Ordering::SeqCst);
        }
    }

    impl VoteLog for FlakyVoteLog {
        fn append(&self, vote: VoteRecord) -> BoxFuture<'static, StorageResult<usize>> {
            if self.healthy.load(Ordering::SeqCst) {
                return self.inner.append(vote);
            }
            Box::pin(async {
                Err(StorageError::Unavailable {
                    message: "vote log offline".into(),
                    source: Box::new(io::Error::other("connection reset")),
                })
            })
        }

        fn list(&self) -> BoxFuture<'static, StorageResult<Vec<VoteRecord>>> {
            self.inner.list()
        }
    }

    fn request(song: &str, vote_value: VoteValue) -> VoteSubmissionRequest {
        VoteSubmissionRequest {
            song: song.into(),
            vote_value,
            nfctagid: None,
        }
    }

    #[tokio::test]
    async fn second_vote_inside_period_is_throttled() {
        let state = AppState::new(AppConfig::default());
        let response = record(&state, "user-1", Some("user-1".into()), request("Ocean Waves", VoteValue::UP))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data.user_id.as_deref(), Some("user-1"));

        let err = record(&state, "user-1", None, request("Rain Sounds", VoteValue::DOWN))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Throttled { waiting_time } if (59..=60).contains(&waiting_time)));
        assert_eq!(list(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_body_does_not_consume_the_slot() {
        let state = AppState::new(AppConfig::default());
        let err = record(&state, "caller", None, request(" ", VoteValue::UP))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(record(&state, "caller", None, request("Ocean Waves", VoteValue::UP))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn failed_append_gives_the_slot_back() {
        let log = Arc::new(FlakyVoteLog::default());
        let state = AppState::with_components(
            AppConfig::default(),
            log.clone(),
            Arc::new(MockVoteSubmitter::new("http://localhost:3000")),
        );

        let err = record(&state, "user-1", None, request("Ocean Waves", VoteValue::UP))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(state.vote_wait("user-1", Instant::now()), None);

        log.recover();
        record(&state, "user-1", None, request("Ocean Waves", VoteValue::UP))
            .await
            .unwrap();
        assert_eq!(list(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tally_keeps_first_seen_order() {
        let state = AppState::new(AppConfig {
            throttle_period: std::time::Duration::ZERO,
            ..AppConfig::default()
        });
        for (song, vote) in [
            ("Rain Sounds", VoteValue::UP),
            ("Ocean Waves", VoteValue::DOWN),
            ("Rain Sounds", VoteValue::DOWN),
            ("Rain Sounds", VoteValue::UP),
        ] {
            record(&state, "caller", None, request(song, vote)).await.unwrap();
        }

        let tally = tally(&state).await.unwrap();
        assert_eq!(
            tally,
            vec![
                TallyEntry {
                    song: "Rain Sounds".into(),
                    positive: 2,
                    negative: 1,
                    total: 3,
                },
                TallyEntry {
                    song: "Ocean Waves".into(),
                    positive: 0,
                    negative: 1,
                    total: 1,
                },
            ]
        );
    }
}
