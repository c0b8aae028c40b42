//! Vote submission seam. The only implementation traces the request it would send.

use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use tracing::info;

use crate::{
    dao::models::VoteRecord,
    dto::{
        format_system_time,
        vote::{SubmissionResponse, VoteSubmissionRequest},
    },
    error::ServiceError,
    state::vote::VoteValue,
};

/// Build a vote record stamped with the current time.
pub fn new_vote_record(
    song: String,
    vote_value: VoteValue,
    user_id: Option<String>,
    nfctagid: Option<String>,
) -> VoteRecord {
    let now = SystemTime::now();
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();

    VoteRecord {
        id: format!("vote-{millis}"),
        user_id,
        song,
        vote_value,
        vote_time: format_system_time(now),
        nfctagid,
    }
}

/// Sends a vote to the votes endpoint.
pub trait VoteSubmitter: Send + Sync {
    fn submit(&self, vote: VoteRecord) -> BoxFuture<'static, Result<SubmissionResponse, ServiceError>>;
}

/// Stand-in for `POST /api/votes`: logs the request and always succeeds.
#[derive(Debug, Clone)]
pub struct MockVoteSubmitter {
    endpoint: String,
}

impl MockVoteSubmitter {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/votes", api_base_url.trim_end_matches('/')),
        }
    }

    /// Endpoint the request would be sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl VoteSubmitter for MockVoteSubmitter {
    fn submit(&self, vote: VoteRecord) -> BoxFuture<'static, Result<SubmissionResponse, ServiceError>> {
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let request = VoteSubmissionRequest::from(&vote);
            let body = serde_json::to_string_pretty(&request)
                .map_err(|err| ServiceError::Internal(err.to_string()))?;

            info!(
                endpoint = %endpoint,
                method = "POST",
                content_type = "application/json",
                authorization = "Bearer dummy-token",
                body = %body,
                "simulated vote submission"
            );

            Ok(SubmissionResponse::recorded(vote))
        })
    }
}
