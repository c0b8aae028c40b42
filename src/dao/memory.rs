use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::json;
use uuid::Uuid;

use crate::dao::{
    account_store::AccountStore,
    models::{AuthTokens, AuthenticatedUser, ProfileRow},
    storage::{StorageError, StorageResult},
};

/// Account store backed by fixed maps, enforcing owner-only profile reads like RLS would.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    users: Arc<HashMap<String, MemoryUser>>,
    guests: Arc<DashMap<String, MemoryUser>>,
    profiles: Arc<HashMap<String, ProfileRow>>,
    query_error: Option<String>,
    broken: Arc<AtomicBool>,
    profiles_offline: Arc<AtomicBool>,
}

#[derive(Clone)]
struct MemoryUser {
    id: String,
    email: Option<String>,
    password: String,
    token: String,
    is_anonymous: bool,
}

impl MemoryUser {
    fn registered(name: &str, password: &str) -> Self {
        Self {
            id: format!("user-{name}"),
            email: Some(format!("{name}@example.com")),
            password: password.into(),
            token: format!("token-{name}"),
            is_anonymous: false,
        }
    }

    fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access_token: self.token.clone(),
            refresh_token: None,
            user_id: self.id.clone(),
            email: self.email.clone(),
            is_anonymous: self.is_anonymous,
        }
    }
}

impl MemoryAccountStore {
    /// Store with `alice@example.com` / `secret` (token `token-alice`, has a profile) and
    /// `bob@example.com` / `hunter2` (token `token-bob`, no profile row).
    pub fn with_alice() -> Self {
        let alice = MemoryUser::registered("alice", "secret");
        let bob = MemoryUser::registered("bob", "hunter2");
        let profiles = HashMap::from([(
            alice.id.clone(),
            json!({ "id": "user-alice", "display_name": "Alice", "votes_cast": 3 }),
        )]);
        Self {
            users: Arc::new(HashMap::from([
                (alice.token.clone(), alice),
                (bob.token.clone(), bob),
            ])),
            guests: Arc::default(),
            profiles: Arc::new(profiles),
            query_error: None,
            broken: Arc::default(),
            profiles_offline: Arc::default(),
        }
    }

    /// Make every profile query fail with `message`, as a store-side query error.
    pub fn failing_queries(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    /// Make every call fail as if the network was down.
    pub fn break_connection(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Keep tokens working but fail profile reads as if the database was down.
    pub fn break_profile_reads(&self) {
        self.profiles_offline.store(true, Ordering::SeqCst);
    }

    /// Number of guest accounts created so far.
    pub fn guest_count(&self) -> usize {
        self.guests.len()
    }

    fn user_by_token(&self, token: &str) -> Option<MemoryUser> {
        self.users
            .get(token)
            .cloned()
            .or_else(|| self.guests.get(token).map(|guest| guest.clone()))
    }

    fn check_connection(&self) -> StorageResult<()> {
        Self::check(&self.broken)
    }

    fn check(flag: &AtomicBool) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                "memory store offline".into(),
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ))
        } else {
            Ok(())
        }
    }
}

impl AccountStore for MemoryAccountStore {
    fn get_user(&self, access_token: &str) -> BoxFuture<'static, StorageResult<AuthenticatedUser>> {
        let store = self.clone();
        let token = access_token.to_string();
        Box::pin(async move {
            store.check_connection()?;
            store
                .user_by_token(&token)
                .map(|user| AuthenticatedUser {
                    id: user.id,
                    email: user.email,
                    access_token: token.clone(),
                    is_anonymous: user.is_anonymous,
                })
                .ok_or_else(|| StorageError::unauthorized("invalid JWT"))
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, StorageResult<AuthTokens>> {
        let store = self.clone();
        let (email, password) = (email.to_string(), password.to_string());
        Box::pin(async move {
            store.check_connection()?;
            store
                .users
                .values()
                .find(|user| user.email.as_deref() == Some(email.as_str()) && user.password == password)
                .map(MemoryUser::tokens)
                .ok_or_else(|| StorageError::unauthorized("Invalid login credentials"))
        })
    }

    fn sign_in_anonymously(&self) -> BoxFuture<'static, StorageResult<AuthTokens>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_connection()?;
            let id = Uuid::new_v4().simple().to_string();
            let guest = MemoryUser {
                id: format!("guest-{id}"),
                email: None,
                password: String::new(),
                token: format!("token-guest-{id}"),
                is_anonymous: true,
            };
            let tokens = guest.tokens();
            store.guests.insert(guest.token.clone(), guest);
            Ok(tokens)
        })
    }

    fn fetch_profile(
        &self,
        user: &AuthenticatedUser,
    ) -> BoxFuture<'static, StorageResult<ProfileRow>> {
        let store = self.clone();
        let user = user.clone();
        Box::pin(async move {
            store.check_connection()?;
            Self::check(&store.profiles_offline)?;
            if let Some(message) = &store.query_error {
                return Err(StorageError::query(message.clone()));
            }

            let owner = store
                .user_by_token(&user.access_token)
                .ok_or_else(|| StorageError::unauthorized("invalid JWT"))?;
            // Rows are only visible to their owner.
            store
                .profiles
                .get(&user.id)
                .filter(|_| owner.id == user.id)
                .cloned()
                .ok_or_else(|| {
                    StorageError::query("JSON object requested, multiple (or no) rows returned")
                })
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check_connection() })
    }
}
