use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{models::VoteRecord, storage::StorageResult};

/// Append-only history of submitted votes.
pub trait VoteLog: Send + Sync {
    /// Append `vote` and return the log length afterwards.
    fn append(&self, vote: VoteRecord) -> BoxFuture<'static, StorageResult<usize>>;
    /// Every vote, oldest first.
    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<VoteRecord>>>;
}

/// Process-local vote log.
#[derive(Clone, Default)]
pub struct MemoryVoteLog {
    votes: Arc<RwLock<Vec<VoteRecord>>>,
}

impl MemoryVoteLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VoteLog for MemoryVoteLog {
    fn append(&self, vote: VoteRecord) -> BoxFuture<'static, StorageResult<usize>> {
        let votes = self.votes.clone();
        Box::pin(async move {
            let mut guard = votes.write().await;
            guard.push(vote);
            Ok(guard.len())
        })
    }

    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<VoteRecord>>> {
        let votes = self.votes.clone();
        Box::pin(async move { Ok(votes.read().await.clone()) })
    }
}
