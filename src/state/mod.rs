pub mod auth_events;
pub mod favorites;
pub mod session;
pub mod vote;
pub mod vote_page;

use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{
    sync::{RwLock, watch},
    time::Instant,
};

use crate::{
    config::AppConfig,
    dao::{
        account_store::AccountStore,
        vote_log::{MemoryVoteLog, VoteLog},
    },
    error::ServiceError,
    services::submission::{MockVoteSubmitter, VoteSubmitter},
};

pub use self::auth_events::{AuthChange, AuthHub, AuthSubscription};
pub use self::favorites::FavoriteStore;
pub use self::session::{SessionId, SessionStore};

pub type SharedState = Arc<AppState>;

/// Buffered auth changes per session before slow listeners start lagging.
const AUTH_EVENT_CAPACITY: usize = 8;

/// Central application state: configuration, client sessions and backend handles.
pub struct AppState {
    config: AppConfig,
    sessions: SessionStore,
    auth_events: AuthHub,
    account_store: RwLock<Option<Arc<dyn AccountStore>>>,
    vote_log: Arc<dyn VoteLog>,
    submitter: Arc<dyn VoteSubmitter>,
    favorites: FavoriteStore,
    last_votes: DashMap<String, Instant>,
    degraded: watch::Sender<bool>,
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub vote_slots: usize,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until an account store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let submitter = Arc::new(MockVoteSubmitter::new(&config.api_base_url));
        Self::with_components(config, Arc::new(MemoryVoteLog::new()), submitter)
    }

    /// Same as [`AppState::new`] with explicit vote log and submitter implementations.
    pub fn with_components(
        config: AppConfig,
        vote_log: Arc<dyn VoteLog>,
        submitter: Arc<dyn VoteSubmitter>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            sessions: SessionStore::new(),
            auth_events: AuthHub::new(AUTH_EVENT_CAPACITY),
            account_store: RwLock::new(None),
            vote_log,
            submitter,
            favorites: FavoriteStore::new(),
            last_votes: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Typed per-browser session storage.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Subject publishing auth-state changes per session.
    pub fn auth_events(&self) -> &AuthHub {
        &self.auth_events
    }

    pub fn vote_log(&self) -> &Arc<dyn VoteLog> {
        &self.vote_log
    }

    pub fn submitter(&self) -> &Arc<dyn VoteSubmitter> {
        &self.submitter
    }

    pub fn favorites(&self) -> &FavoriteStore {
        &self.favorites
    }

    /// Obtain a handle to the current account store, if one is installed.
    pub async fn account_store(&self) -> Option<Arc<dyn AccountStore>> {
        let guard = self.account_store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::account_store`] but fails with [`ServiceError::Degraded`].
    pub async fn require_account_store(&self) -> Result<Arc<dyn AccountStore>, ServiceError> {
        self.account_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new account store implementation and leave degraded mode.
    pub async fn install_account_store(&self, store: Arc<dyn AccountStore>) {
        {
            let mut guard = self.account_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current account store and enter degraded mode.
    pub async fn clear_account_store(&self) {
        {
            let mut guard = self.account_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.account_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Reserve a vote slot for `caller`, or return the seconds left until one frees up.
    ///
    /// A claim whose vote is never recorded must be handed back with
    /// [`AppState::release_vote_slot`].
    pub fn claim_vote_slot(&self, caller: &str, now: Instant) -> Result<(), u64> {
        let period = self.config.throttle_period;
        match self.last_votes.entry(caller.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < period {
                    return Err(ceil_secs(period - elapsed));
                }
                entry.insert(now);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(())
            }
        }
    }

    /// Undo the claim made at `claimed_at`; a newer claim by the same caller is kept.
    pub fn release_vote_slot(&self, caller: &str, claimed_at: Instant) {
        self.last_votes
            .remove_if(caller, |_, last| *last == claimed_at);
    }

    /// Seconds `caller` still has to wait before voting, if any.
    pub fn vote_wait(&self, caller: &str, now: Instant) -> Option<u64> {
        let last = *self.last_votes.get(caller)?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.config.throttle_period)
            .then(|| ceil_secs(self.config.throttle_period - elapsed))
    }

    /// Callers currently holding a vote slot.
    pub fn vote_slots(&self) -> usize {
        self.last_votes.len()
    }

    /// Forget idle sessions and vote slots whose period is over.
    ///
    /// Sessions with a live auth event stream are kept.
    pub fn sweep_idle(&self, now: Instant) -> SweepReport {
        let sessions = self.sessions.evict_idle(now, self.config.session_idle_timeout, |id| {
            self.auth_events.is_watched(id)
        });

        let period = self.config.throttle_period;
        let before = self.last_votes.len();
        self.last_votes
            .retain(|_, last| now.saturating_duration_since(*last) < period);

        SweepReport {
            sessions,
            vote_slots: before.saturating_sub(self.last_votes.len()),
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryAccountStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        let watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_account_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_account_store(Arc::new(MemoryAccountStore::with_alice()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(!*watcher.borrow());

        state.clear_account_store().await;
        assert!(*watcher.borrow());
    }

    #[test]
    fn vote_slot_reopens_after_period() {
        let state = AppState::new(AppConfig::default());
        let start = Instant::now();

        assert_eq!(state.claim_vote_slot("user-1", start), Ok(()));
        assert_eq!(
            state.claim_vote_slot("user-1", start + Duration::from_millis(18_500)),
            Err(42)
        );
        assert_eq!(state.claim_vote_slot("user-2", start), Ok(()));
        assert_eq!(
            state.claim_vote_slot("user-1", start + Duration::from_secs(60)),
            Ok(())
        );
    }

    #[test]
    fn released_slot_can_be_claimed_again() {
        let state = AppState::new(AppConfig::default());
        let start = Instant::now();

        state.claim_vote_slot("user-1", start).unwrap();
        assert_eq!(state.vote_wait("user-1", start + Duration::from_secs(15)), Some(45));

        state.release_vote_slot("user-1", start);
        assert_eq!(state.vote_wait("user-1", start), None);
        assert_eq!(state.claim_vote_slot("user-1", start), Ok(()));
    }

    #[test]
    fn stale_release_keeps_the_newer_claim() {
        let state = AppState::new(AppConfig::default());
        let first = Instant::now();
        let second = first + Duration::from_secs(61);

        state.claim_vote_slot("user-1", first).unwrap();
        state.claim_vote_slot("user-1", second).unwrap();
        state.release_vote_slot("user-1", first);
        assert!(state.vote_wait("user-1", second).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_idle_sessions_and_expired_slots() {
        let state = AppState::new(AppConfig {
            session_idle_timeout: Duration::from_secs(600),
            ..AppConfig::default()
        });
        let (idle, _) = state.sessions().resume_or_create(None);
        let (streaming, _) = state.sessions().resume_or_create(None);
        let _listener = state.auth_events().subscribe(streaming);
        state.claim_vote_slot("user-1", Instant::now()).unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(state.sweep_idle(Instant::now()), SweepReport::default());

        tokio::time::advance(Duration::from_secs(600)).await;
        let report = state.sweep_idle(Instant::now());
        assert_eq!(
            report,
            SweepReport {
                sessions: 1,
                vote_slots: 1
            }
        );
        assert!(!state.sessions().contains(idle));
        assert!(state.sessions().contains(streaming));
        assert_eq!(state.vote_slots(), 0);
    }
}
