use serde::{Deserialize, Serialize};

use crate::dao::models::AuthTokens;

/// User object returned by `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
pub struct GoTrueUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Body of the password grant.
#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of the anonymous sign-up; no credentials, empty user metadata.
#[derive(Debug, Default, Serialize)]
pub struct AnonymousSignUp {
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Session returned by `POST /auth/v1/token` and `POST /auth/v1/signup`.
#[derive(Debug, Deserialize)]
pub struct GoTrueSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: GoTrueUser,
}

impl From<GoTrueSession> for AuthTokens {
    fn from(session: GoTrueSession) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user_id: session.user.id,
            email: session.user.email.filter(|email| !email.is_empty()),
            is_anonymous: session.user.is_anonymous,
        }
    }
}

/// Error payload shared (loosely) by GoTrue and PostgREST.
///
/// PostgREST uses `message`, GoTrue uses `msg` or `error_description` depending on the
/// endpoint and version.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ApiErrorBody {
    /// Best human readable explanation found in the payload.
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description)
    }
}
