use axum::{
    Extension, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::get,
};

use crate::{
    dao::models::{AuthenticatedUser, ProfileRow},
    error::AppError,
    services::{auth_service, profile_service},
    state::SharedState,
};

/// Bearer-protected profile route.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route_layer(middleware::from_fn_with_state(state, authenticate_token))
}

/// Profile row of the caller.
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    params(("Authorization" = String, Header, description = "`Bearer <access token>`")),
    responses(
        (status = 200, description = "Profile row of the caller", body = Object),
        (status = 400, description = "Query rejected by the store"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Failed to fetch profile")
    )
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ProfileRow>, AppError> {
    Ok(Json(profile_service::fetch_profile(&state, &user).await?))
}

/// Resolve the bearer token and hand the caller's identity to the handler.
pub(crate) async fn authenticate_token(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let user = auth_service::authenticate_bearer(&state, &token).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Token of an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
