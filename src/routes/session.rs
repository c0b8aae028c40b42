//! Cookie-backed client session extractor.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::state::{SessionId, SharedState};

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sv_session";

/// Caller's session, created on first contact.
///
/// Handlers must return `jar` with their response so a new session cookie reaches the browser.
pub struct SessionContext {
    pub id: SessionId,
    pub jar: CookieJar,
}

impl FromRequestParts<SharedState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let known = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

        let (id, created) = state.sessions().resume_or_create(known);
        let jar = if created {
            jar.add(session_cookie(id))
        } else {
            jar
        };

        Ok(Self { id, jar })
    }
}

fn session_cookie(id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
