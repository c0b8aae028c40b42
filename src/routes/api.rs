use axum::{
    Extension, Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};

use crate::{
    dao::models::{AuthenticatedUser, VoteRecord},
    dto::{
        vote::{SubmissionResponse, TallyEntry, VoteSubmissionRequest},
        voter::{FavoriteRequest, FavoriteView},
    },
    error::AppError,
    routes::profile::authenticate_token,
    services::{voter_service, votes_service},
    state::SharedState,
};

/// Votes API. Listing and tallies are public; voting and favourites need a bearer token.
pub fn router(state: SharedState) -> Router<SharedState> {
    let auth = middleware::from_fn_with_state(state, authenticate_token);
    Router::<SharedState>::new()
        .route(
            "/api/votes",
            post(create_vote).route_layer(auth.clone()).get(list_votes),
        )
        .route("/api/votes/tally", get(vote_tally))
        .route(
            "/api/favorites",
            get(list_favorites)
                .post(toggle_favorite)
                .route_layer(auth),
        )
}

/// Record a vote for the caller. The throttle applies per user.
#[utoipa::path(
    post,
    path = "/api/votes",
    tag = "votes",
    params(("Authorization" = String, Header, description = "`Bearer <access token>`")),
    request_body = VoteSubmissionRequest,
    responses(
        (status = 200, description = "Vote recorded", body = SubmissionResponse),
        (status = 400, description = "Invalid vote"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 429, description = "Voted too recently; `waiting_time` holds the seconds left")
    )
)]
pub async fn create_vote(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<VoteSubmissionRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let response = votes_service::record(&state, &user.id, Some(user.id.clone()), request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/votes",
    tag = "votes",
    responses((status = 200, description = "Every recorded vote, oldest first", body = [VoteRecord]))
)]
pub async fn list_votes(State(state): State<SharedState>) -> Result<Json<Vec<VoteRecord>>, AppError> {
    Ok(Json(votes_service::list(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/votes/tally",
    tag = "votes",
    responses((status = 200, description = "Per-song counts in first-seen order", body = [TallyEntry]))
)]
pub async fn vote_tally(State(state): State<SharedState>) -> Result<Json<Vec<TallyEntry>>, AppError> {
    Ok(Json(votes_service::tally(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    tag = "votes",
    params(("Authorization" = String, Header, description = "`Bearer <access token>`")),
    responses(
        (status = 200, description = "Favourite songs of the caller, oldest like first", body = [String]),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn list_favorites(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<Vec<String>> {
    Json(voter_service::favorites(&state, &user))
}

/// Like or unlike a song; without `liked` the current flag flips.
#[utoipa::path(
    post,
    path = "/api/favorites",
    tag = "votes",
    params(("Authorization" = String, Header, description = "`Bearer <access token>`")),
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "Favourite flag after the update", body = FavoriteView),
        (status = 400, description = "Invalid song title"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Song is not in the catalogue")
    )
)]
pub async fn toggle_favorite(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<FavoriteView>, AppError> {
    Ok(Json(voter_service::toggle_favorite(&state, &user, request)?))
}
