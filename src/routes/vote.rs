use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;

use crate::{
    dto::vote::{ConfirmationView, ManualVoteRequest, VotePageQuery, VotePageView},
    error::AppError,
    routes::session::SessionContext,
    services::{
        confirmation_service::{self, ConfirmationOutcome, ReturnTarget},
        vote_service::{self, VotePageOutcome},
    },
    state::{SharedState, vote::VoteValue},
};

/// Client hint headers carrying the viewport width, most specific first.
const VIEWPORT_HEADERS: [&str; 2] = ["sec-ch-viewport-width", "viewport-width"];

/// Vote page, confirmation page and the confirmation button.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/vote", get(vote_page).post(manual_vote))
        .route("/vote/return", post(return_to_voting))
        .route("/vote/{vote_value}", get(confirmation_page))
}

#[utoipa::path(
    get,
    path = "/vote",
    tag = "vote",
    params(VotePageQuery),
    responses(
        (status = 200, description = "Vote page", body = VotePageView),
        (status = 303, description = "Vote from the URL recorded; continue to /vote/{voteValue}")
    )
)]
/// Open the vote page, voting right away when the URL carries a tag or vote value.
pub async fn vote_page(
    State(state): State<SharedState>,
    session: SessionContext,
    headers: HeaderMap,
    Query(query): Query<VotePageQuery>,
) -> (CookieJar, Result<Response, AppError>) {
    let width = viewport_width(&headers, query.width);
    let result = vote_service::open_page(&state, session.id, query, width)
        .await
        .map(|outcome| match outcome {
            VotePageOutcome::Render(view) => Json(view).into_response(),
            VotePageOutcome::Voted(vote) => confirmation_redirect(vote),
        })
        .map_err(AppError::from);

    (session.jar, result)
}

#[utoipa::path(
    post,
    path = "/vote",
    tag = "vote",
    request_body = ManualVoteRequest,
    responses(
        (status = 303, description = "Vote recorded; continue to /vote/{voteValue}"),
        (status = 409, description = "No song loaded yet or a vote is already in flight")
    )
)]
/// Thumbs button press.
pub async fn manual_vote(
    State(state): State<SharedState>,
    session: SessionContext,
    Json(request): Json<ManualVoteRequest>,
) -> (CookieJar, Result<Response, AppError>) {
    let result = vote_service::submit_manual(&state, session.id, request.vote_value)
        .await
        .map(confirmation_redirect)
        .map_err(AppError::from);

    (session.jar, result)
}

#[utoipa::path(
    get,
    path = "/vote/{vote_value}",
    tag = "vote",
    params(("vote_value" = String, Path, description = "Vote just cast, `0` or `1`")),
    responses(
        (status = 200, description = "Confirmation page", body = ConfirmationView),
        (status = 303, description = "No matching vote in this session; back to /vote")
    )
)]
/// Confirmation page for the vote this session just cast.
pub async fn confirmation_page(
    State(state): State<SharedState>,
    session: SessionContext,
    Path(vote_value): Path<String>,
) -> (CookieJar, Response) {
    let response = match confirmation_service::open(&state, session.id, &vote_value).await {
        ConfirmationOutcome::Render(view) => Json(view).into_response(),
        ConfirmationOutcome::RedirectToVote => Redirect::to("/vote").into_response(),
    };

    (session.jar, response)
}

#[utoipa::path(
    post,
    path = "/vote/return",
    tag = "vote",
    responses((status = 303, description = "Back to /vote when signed in, otherwise to /login"))
)]
/// Confirmation page button.
pub async fn return_to_voting(
    State(state): State<SharedState>,
    session: SessionContext,
) -> (CookieJar, Redirect) {
    let target = match confirmation_service::return_action(&state, session.id).await {
        ReturnTarget::Vote => "/vote",
        ReturnTarget::Login => "/login",
    };

    (session.jar, Redirect::to(target))
}

fn confirmation_redirect(vote: VoteValue) -> Response {
    Redirect::to(&format!("/vote/{vote}")).into_response()
}

/// Viewport width from client hints, then from the query string.
fn viewport_width(headers: &HeaderMap, query_width: Option<u32>) -> Option<u32> {
    VIEWPORT_HEADERS
        .iter()
        .find_map(|name| headers.get(*name)?.to_str().ok()?.trim().parse().ok())
        .or(query_width)
}
