use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::AuthenticatedUser;

/// Credentials posted to `/login`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Login state of the caller's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LoginView {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Signed in with a guest account that has no credentials.
    pub guest: bool,
}

impl LoginView {
    pub fn signed_out() -> Self {
        Self {
            logged_in: false,
            email: None,
            guest: false,
        }
    }

    pub fn signed_in(email: Option<String>) -> Self {
        Self {
            logged_in: true,
            email,
            guest: false,
        }
    }

    pub fn guest() -> Self {
        Self {
            logged_in: true,
            email: None,
            guest: true,
        }
    }

    pub fn for_user(user: &AuthenticatedUser) -> Self {
        if user.is_anonymous {
            Self::guest()
        } else {
            Self::signed_in(user.email.clone())
        }
    }
}
