use futures::future::BoxFuture;

use crate::dao::{
    models::{AuthTokens, AuthenticatedUser, ProfileRow},
    storage::StorageResult,
};

/// Abstraction over the hosted auth service and its row-level-security protected tables.
pub trait AccountStore: Send + Sync {
    /// Resolve the user owning `access_token`; rejected tokens yield `StorageError::Unauthorized`.
    fn get_user(&self, access_token: &str) -> BoxFuture<'static, StorageResult<AuthenticatedUser>>;
    /// Exchange email and password for session tokens.
    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, StorageResult<AuthTokens>>;
    /// Create a guest account and sign it in.
    fn sign_in_anonymously(&self) -> BoxFuture<'static, StorageResult<AuthTokens>>;
    /// Fetch the single profile row of `user`, querying as that user.
    fn fetch_profile(&self, user: &AuthenticatedUser)
    -> BoxFuture<'static, StorageResult<ProfileRow>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
