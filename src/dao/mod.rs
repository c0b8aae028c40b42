/// Hosted auth and profile store abstraction.
pub mod account_store;
/// In-memory account store used by tests.
#[cfg(test)]
pub mod memory;
/// Persistence model definitions.
pub mod models;
/// Storage error types shared by every backend.
pub mod storage;
/// Supabase (GoTrue + PostgREST) account store.
#[cfg(feature = "supabase-store")]
pub mod supabase;
/// Append-only log of submitted votes.
pub mod vote_log;
