use axum::Router;

use crate::state::SharedState;

pub mod api;
pub mod auth;
pub mod docs;
pub mod health;
pub mod profile;
pub mod session;
pub mod vote;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(vote::router())
        .merge(auth::router())
        .merge(api::router(state.clone()))
        .merge(profile::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
