use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::state::session::SessionId;

/// Auth-state change observed for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
}

impl AuthChange {
    /// Whether the session is logged in after this change.
    pub fn logged_in(self) -> bool {
        matches!(self, AuthChange::SignedIn)
    }
}

type Channels = DashMap<SessionId, broadcast::Sender<AuthChange>>;

/// Per-session subject for auth-state notifications.
pub struct AuthHub {
    channels: Arc<Channels>,
    capacity: usize,
}

impl AuthHub {
    /// Construct a hub whose per-session channels buffer `capacity` changes.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Register a listener for `session`; dropping the handle unsubscribes it.
    pub fn subscribe(&self, session: SessionId) -> AuthSubscription {
        let receiver = self
            .channels
            .entry(session)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        AuthSubscription {
            session,
            receiver: Some(receiver),
            channels: self.channels.clone(),
        }
    }

    /// Notify every listener of `session`, returning how many received it.
    pub fn publish(&self, session: SessionId, change: AuthChange) -> usize {
        self.channels
            .get(&session)
            .and_then(|sender| sender.send(change).ok())
            .unwrap_or(0)
    }

    /// Whether `session` has at least one live listener.
    pub fn is_watched(&self, session: SessionId) -> bool {
        self.channels.contains_key(&session)
    }

    /// Number of sessions with at least one live listener.
    pub fn active_sessions(&self) -> usize {
        self.channels.len()
    }
}

/// Live subscription to one session's auth changes.
pub struct AuthSubscription {
    session: SessionId,
    receiver: Option<broadcast::Receiver<AuthChange>>,
    channels: Arc<Channels>,
}

impl AuthSubscription {
    /// Session this subscription listens to.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Wait for the next change; `None` once the hub side is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.channels
            .remove_if(&self.session, |_, sender| sender.receiver_count() == 0);
    }
}
