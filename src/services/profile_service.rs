use tracing::error;

use crate::{
    dao::{
        models::{AuthenticatedUser, ProfileRow},
        storage::StorageError,
    },
    error::ServiceError,
    state::SharedState,
};

/// Message returned for any profile failure that is not a query error.
pub const PROFILE_FAILURE: &str = "Failed to fetch profile";

/// Fetch the caller's own profile row, queried with the caller's token.
///
/// Store-reported query errors are passed through to the client; anything else is logged
/// and replaced by [`PROFILE_FAILURE`].
pub async fn fetch_profile(
    state: &SharedState,
    user: &AuthenticatedUser,
) -> Result<ProfileRow, ServiceError> {
    let store = state.require_account_store().await?;

    match store.fetch_profile(user).await {
        Ok(row) => Ok(row),
        Err(StorageError::Query { message }) => Err(ServiceError::InvalidInput(message)),
        Err(err) => {
            error!(user_id = %user.id, error = %err, "profile lookup failed");
            Err(ServiceError::Internal(PROFILE_FAILURE.into()))
        }
    }
}
