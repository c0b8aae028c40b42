//! Server-side client sessions: the typed replacement for browser session storage.
//!
//! Every accessor touches one map entry synchronously and returns owned data, so no
//! entry guard is ever held across an `.await`.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    dao::models::AuthTokens,
    state::{vote::VoteValue, vote_page::VotePage},
};

/// Opaque identifier carried by the session cookie.
pub type SessionId = Uuid;

/// Capability written after a vote; the confirmation page requires it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteFlags {
    /// Value of the vote just submitted.
    pub vote_value: VoteValue,
    /// Song shown when the vote was submitted.
    pub song: String,
}

/// One-shot data handed from the vote page to the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub song: String,
    pub vote_value: VoteValue,
    pub nfctagid: Option<String>,
}

/// Everything the server remembers about one browser session.
#[derive(Debug, Clone)]
pub struct ClientSession {
    vote_flags: Option<VoteFlags>,
    navigation: Option<NavigationState>,
    auth: Option<AuthTokens>,
    page: Option<VotePage>,
    last_seen: Instant,
}

impl ClientSession {
    fn new() -> Self {
        Self {
            vote_flags: None,
            navigation: None,
            auth: None,
            page: None,
            last_seen: Instant::now(),
        }
    }
}

/// Registry of live client sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, ClientSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `id` when it names a live session, otherwise open a new one.
    ///
    /// The boolean is true when a session was created and the cookie must be (re)issued.
    /// Resuming a session marks it as seen.
    pub fn resume_or_create(&self, id: Option<SessionId>) -> (SessionId, bool) {
        if let Some(id) = id {
            if let Some(mut session) = self.sessions.get_mut(&id) {
                session.last_seen = Instant::now();
                return (id, false);
            }
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, ClientSession::new());
        (id, true)
    }

    /// Drop sessions not seen for longer than `idle`, unless `keep` vouches for them.
    ///
    /// Returns how many sessions were removed.
    pub fn evict_idle(
        &self,
        now: Instant,
        idle: Duration,
        keep: impl Fn(SessionId) -> bool,
    ) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, session| {
            now.saturating_duration_since(session.last_seen) <= idle || keep(*id)
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Whether `id` names a live session.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Current vote flags, if a vote was submitted and not yet acknowledged.
    pub fn vote_flags(&self, id: SessionId) -> Option<VoteFlags> {
        self.sessions
            .get(&id)
            .and_then(|session| session.vote_flags.clone())
    }

    /// Record a finished vote: flags plus the navigation hand-off, in one step.
    pub fn record_vote(&self, id: SessionId, flags: VoteFlags, navigation: NavigationState) {
        let mut session = self.sessions.entry(id).or_insert_with(ClientSession::new);
        session.vote_flags = Some(flags);
        session.navigation = Some(navigation);
    }

    /// Consume the navigation hand-off; later reads fall back to the flags.
    pub fn take_navigation(&self, id: SessionId) -> Option<NavigationState> {
        self.sessions
            .get_mut(&id)
            .and_then(|mut session| session.navigation.take())
    }

    /// Forget the last vote and the page instance that produced it.
    pub fn clear_vote(&self, id: SessionId) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.vote_flags = None;
            session.navigation = None;
            if session.page.as_ref().is_some_and(|page| page.has_voted()) {
                session.page = None;
            }
        }
    }

    /// Tokens of the signed-in user, if any.
    pub fn auth_tokens(&self, id: SessionId) -> Option<AuthTokens> {
        self.sessions
            .get(&id)
            .and_then(|session| session.auth.clone())
    }

    pub fn set_auth_tokens(&self, id: SessionId, tokens: AuthTokens) {
        self.sessions.entry(id).or_insert_with(ClientSession::new).auth = Some(tokens);
    }

    /// Drop the stored tokens, returning whether the session was signed in.
    pub fn clear_auth_tokens(&self, id: SessionId) -> bool {
        self.sessions
            .get_mut(&id)
            .and_then(|mut session| session.auth.take())
            .is_some()
    }

    /// Copy of the session's vote page instance.
    pub fn page(&self, id: SessionId) -> Option<VotePage> {
        self.sessions
            .get(&id)
            .and_then(|session| session.page.clone())
    }

    /// Run `f` against the session's page slot while holding the entry.
    ///
    /// `f` must not block; it is the only way to read-modify-write a page atomically.
    pub fn with_page<R>(&self, id: SessionId, f: impl FnOnce(&mut Option<VotePage>) -> R) -> R {
        let mut session = self.sessions.entry(id).or_insert_with(ClientSession::new);
        f(&mut session.page)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
