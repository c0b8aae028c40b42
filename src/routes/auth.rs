use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use futures::Stream;

use crate::{
    dto::auth::{LoginRequest, LoginView},
    error::AppError,
    routes::session::SessionContext,
    services::{auth_service, sse_service},
    state::SharedState,
};

/// Login state, sign-in, sign-out and the auth event stream.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/login", get(login_page).post(login))
        .route("/login/guest", post(guest_login))
        .route("/logout", post(logout))
        .route("/auth/events", get(auth_events))
}

#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    responses((status = 200, description = "Login state of this session", body = LoginView))
)]
pub async fn login_page(
    State(state): State<SharedState>,
    session: SessionContext,
) -> (CookieJar, Json<LoginView>) {
    let view = auth_service::login_view(&state, session.id).await;
    (session.jar, Json(view))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginView),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Credentials rejected"),
        (status = 503, description = "Account store unavailable")
    )
)]
/// Password sign-in for this session.
pub async fn login(
    State(state): State<SharedState>,
    session: SessionContext,
    Json(request): Json<LoginRequest>,
) -> (CookieJar, Result<Json<LoginView>, AppError>) {
    let result = auth_service::login(&state, session.id, request)
        .await
        .map(Json)
        .map_err(AppError::from);
    (session.jar, result)
}

#[utoipa::path(
    post,
    path = "/login/guest",
    tag = "auth",
    responses(
        (status = 200, description = "Signed in with a guest account", body = LoginView),
        (status = 401, description = "Guest accounts are disabled"),
        (status = 503, description = "Account store unavailable")
    )
)]
/// Continue without credentials.
pub async fn guest_login(
    State(state): State<SharedState>,
    session: SessionContext,
) -> (CookieJar, Result<Json<LoginView>, AppError>) {
    let result = auth_service::guest_login(&state, session.id)
        .await
        .map(Json)
        .map_err(AppError::from);
    (session.jar, result)
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(
    State(state): State<SharedState>,
    session: SessionContext,
) -> (CookieJar, StatusCode) {
    auth_service::logout(&state, session.id);
    (session.jar, StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/events",
    tag = "auth",
    responses((status = 200, description = "`signed_in` / `signed_out` events, current state first", content_type = "text/event-stream", body = String))
)]
/// Stream auth-state changes of this session.
pub async fn auth_events(
    State(state): State<SharedState>,
    session: SessionContext,
) -> (
    CookieJar,
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
) {
    let subscription = sse_service::subscribe_auth(&state, session.id);
    let current = sse_service::current_auth_state(&state, session.id).await;
    (session.jar, sse_service::to_sse_stream(subscription, current))
}
