use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::models::AuthenticatedUser,
    dto::auth::{LoginRequest, LoginView},
    error::ServiceError,
    state::{AuthChange, SessionId, SharedState},
};

/// Resolve the user signed in on `session`, checking the stored token with the account store.
pub async fn current_user(
    state: &SharedState,
    session: SessionId,
) -> Result<Option<AuthenticatedUser>, ServiceError> {
    let Some(tokens) = state.sessions().auth_tokens(session) else {
        return Ok(None);
    };

    let store = state.require_account_store().await?;
    let user = store.get_user(&tokens.access_token).await?;
    Ok(Some(user))
}

/// Like [`current_user`], but any failure counts as signed out.
pub async fn signed_in_user(state: &SharedState, session: SessionId) -> Option<AuthenticatedUser> {
    match current_user(state, session).await {
        Ok(user) => user,
        Err(err) => {
            warn!(session = %session, error = %err, "auth check failed; treating as signed out");
            None
        }
    }
}

pub async fn is_logged_in(state: &SharedState, session: SessionId) -> bool {
    signed_in_user(state, session).await.is_some()
}

/// Current login state of the session.
pub async fn login_view(state: &SharedState, session: SessionId) -> LoginView {
    signed_in_user(state, session)
        .await
        .map_or_else(LoginView::signed_out, |user| LoginView::for_user(&user))
}

/// Password sign-in; the tokens stay on the server side of the session.
pub async fn login(
    state: &SharedState,
    session: SessionId,
    request: LoginRequest,
) -> Result<LoginView, ServiceError> {
    request.validate()?;

    let store = state.require_account_store().await?;
    let tokens = store.sign_in(&request.email, &request.password).await?;
    let email = tokens.email.clone();
    info!(session = %session, user_id = %tokens.user_id, "signed in");

    state.sessions().set_auth_tokens(session, tokens);
    state.auth_events().publish(session, AuthChange::SignedIn);
    Ok(LoginView::signed_in(email))
}

/// Sign the session in with a fresh guest account.
///
/// A session that is already signed in keeps its account.
pub async fn guest_login(state: &SharedState, session: SessionId) -> Result<LoginView, ServiceError> {
    if let Ok(Some(user)) = current_user(state, session).await {
        return Ok(LoginView::for_user(&user));
    }

    let store = state.require_account_store().await?;
    let tokens = store.sign_in_anonymously().await?;
    info!(session = %session, user_id = %tokens.user_id, "guest signed in");

    state.sessions().set_auth_tokens(session, tokens);
    state.auth_events().publish(session, AuthChange::SignedIn);
    Ok(LoginView::guest())
}

/// Forget the session's tokens. Signing out twice is not an error.
pub fn logout(state: &SharedState, session: SessionId) {
    if state.sessions().clear_auth_tokens(session) {
        info!(session = %session, "signed out");
        state.auth_events().publish(session, AuthChange::SignedOut);
    }
}

/// Identify the caller of a bearer-protected route.
pub async fn authenticate_bearer(
    state: &SharedState,
    access_token: &str,
) -> Result<AuthenticatedUser, ServiceError> {
    let store = state.require_account_store().await?;
    Ok(store.get_user(access_token).await?)
}
