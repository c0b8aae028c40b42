use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AuthChange;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
/// Auth state pushed on `/auth/events` (`signed_in` / `signed_out`).
pub struct AuthStateEvent {
    pub logged_in: bool,
}

impl AuthStateEvent {
    /// SSE event name for this state.
    pub fn event_name(&self) -> &'static str {
        if self.logged_in {
            "signed_in"
        } else {
            "signed_out"
        }
    }

    /// Serialise into a named SSE event.
    pub fn to_server_event(self) -> serde_json::Result<ServerEvent> {
        ServerEvent::json(Some(self.event_name().to_string()), &self)
    }
}

impl From<AuthChange> for AuthStateEvent {
    fn from(change: AuthChange) -> Self {
        Self {
            logged_in: change.logged_in(),
        }
    }
}
