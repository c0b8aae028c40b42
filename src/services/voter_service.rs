use tokio::time::Instant;
use tracing::info;
use validator::Validate;

use crate::{
    dao::models::AuthenticatedUser,
    dto::voter::{FavoriteRequest, FavoriteView, VoterStats},
    error::ServiceError,
    state::SharedState,
};

/// Progress of `user` after voting on `song`.
pub async fn stats(
    state: &SharedState,
    user: &AuthenticatedUser,
    song: &str,
) -> Result<VoterStats, ServiceError> {
    let votes = state.vote_log().list().await?;
    let (total_votes, votes_here) = votes
        .iter()
        .filter(|vote| vote.user_id.as_deref() == Some(user.id.as_str()))
        .fold((0, 0), |(total, here), vote| {
            (total + 1, here + u64::from(vote.song == song))
        });
    let waiting_time = state.vote_wait(&user.id, Instant::now()).unwrap_or(0);

    Ok(VoterStats::new(
        total_votes,
        votes_here,
        waiting_time,
        user.is_anonymous,
        state.favorites().is_favorite(&user.id, song),
    ))
}

/// Like, unlike or flip a song of the catalogue for `user`.
pub fn toggle_favorite(
    state: &SharedState,
    user: &AuthenticatedUser,
    request: FavoriteRequest,
) -> Result<FavoriteView, ServiceError> {
    request.validate()?;
    if !state.config().songs.contains(&request.song) {
        return Err(ServiceError::NotFound(format!(
            "unknown song `{}`",
            request.song
        )));
    }

    let liked = state
        .favorites()
        .toggle(&user.id, &request.song, request.liked);
    info!(user_id = %user.id, song = %request.song, liked, "favorite updated");

    Ok(FavoriteView {
        song: request.song,
        liked,
    })
}

/// Songs `user` marked as favourites.
pub fn favorites(state: &SharedState, user: &AuthenticatedUser) -> Vec<String> {
    state.favorites().list(&user.id)
}
