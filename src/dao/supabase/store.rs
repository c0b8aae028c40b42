use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response, StatusCode, header::ACCEPT};
use tracing::debug;

use crate::dao::{
    account_store::AccountStore,
    models::{AuthTokens, AuthenticatedUser, ProfileRow},
    storage::StorageResult,
};

use super::{
    config::SupabaseConfig,
    error::{SupabaseDaoError, SupabaseResult},
    models::{AnonymousSignUp, ApiErrorBody, GoTrueSession, GoTrueUser, PasswordGrant},
};

const USER_PATH: &str = "auth/v1/user";
const TOKEN_PATH: &str = "auth/v1/token";
const SIGNUP_PATH: &str = "auth/v1/signup";
const HEALTH_PATH: &str = "auth/v1/health";
/// Makes PostgREST answer with a single object and fail unless exactly one row matches.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SupabaseAccountStore {
    client: Client,
    base_url: Arc<str>,
    anon_key: Arc<str>,
    profile_table: Arc<str>,
}

impl SupabaseAccountStore {
    /// Build the HTTP client and make sure the project answers.
    pub async fn connect(config: SupabaseConfig) -> SupabaseResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SupabaseDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            anon_key: Arc::from(config.anon_key),
            profile_table: Arc::from(config.profile_table),
        };

        store.ping().await?;
        Ok(store)
    }

    /// Request against the project, authenticated as `bearer` or anonymously.
    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client
            .request(method, url)
            .header("apikey", self.anon_key.as_ref())
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_ref()))
    }

    async fn send(&self, builder: reqwest::RequestBuilder, path: &str) -> SupabaseResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| SupabaseDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    async fn decode<T>(response: Response, path: &str) -> SupabaseResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| SupabaseDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    /// Pull the service's explanation out of an error response, if it sent one.
    async fn error_message(response: Response) -> Option<String> {
        response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(ApiErrorBody::into_message)
    }

    async fn ping(&self) -> SupabaseResult<()> {
        let response = self
            .send(self.request(Method::GET, HEALTH_PATH, None), HEALTH_PATH)
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SupabaseDaoError::RequestStatus {
                path: HEALTH_PATH.to_string(),
                status: response.status(),
            })
        }
    }

    async fn user_for_token(&self, access_token: &str) -> SupabaseResult<AuthenticatedUser> {
        let response = self
            .send(
                self.request(Method::GET, USER_PATH, Some(access_token)),
                USER_PATH,
            )
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user = Self::decode::<GoTrueUser>(response, USER_PATH).await?;
                Ok(AuthenticatedUser {
                    id: user.id,
                    email: user.email.filter(|email| !email.is_empty()),
                    access_token: access_token.to_string(),
                    is_anonymous: user.is_anonymous,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = Self::error_message(response)
                    .await
                    .unwrap_or_else(|| "invalid access token".into());
                Err(SupabaseDaoError::Rejected { message })
            }
            other => Err(SupabaseDaoError::RequestStatus {
                path: USER_PATH.to_string(),
                status: other,
            }),
        }
    }

    async fn password_grant(&self, email: &str, password: &str) -> SupabaseResult<AuthTokens> {
        let builder = self
            .request(Method::POST, TOKEN_PATH, None)
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let response = self.send(builder, TOKEN_PATH).await?;

        match response.status() {
            status if status.is_success() => {
                let session = Self::decode::<GoTrueSession>(response, TOKEN_PATH).await?;
                Ok(session.into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let message = Self::error_message(response)
                    .await
                    .unwrap_or_else(|| "invalid login credentials".into());
                Err(SupabaseDaoError::Rejected { message })
            }
            other => Err(SupabaseDaoError::RequestStatus {
                path: TOKEN_PATH.to_string(),
                status: other,
            }),
        }
    }

    /// Anonymous sign-up; fails when the project has anonymous sign-ins disabled.
    async fn anonymous_sign_up(&self) -> SupabaseResult<AuthTokens> {
        let builder = self
            .request(Method::POST, SIGNUP_PATH, None)
            .json(&AnonymousSignUp::default());
        let response = self.send(builder, SIGNUP_PATH).await?;

        match response.status() {
            status if status.is_success() => {
                let session = Self::decode::<GoTrueSession>(response, SIGNUP_PATH).await?;
                Ok(session.into())
            }
            status if status.is_client_error() => {
                let message = Self::error_message(response)
                    .await
                    .unwrap_or_else(|| "anonymous sign-in rejected".into());
                Err(SupabaseDaoError::Rejected { message })
            }
            other => Err(SupabaseDaoError::RequestStatus {
                path: SIGNUP_PATH.to_string(),
                status: other,
            }),
        }
    }

    async fn profile_row(&self, user: &AuthenticatedUser) -> SupabaseResult<ProfileRow> {
        let path = format!("rest/v1/{}", self.profile_table);
        let builder = self
            .request(Method::GET, &path, Some(&user.access_token))
            .header(ACCEPT, SINGLE_OBJECT)
            .query(&[("id", format!("eq.{}", user.id)), ("select", "*".into())]);
        let response = self.send(builder, &path).await?;
        let status = response.status();

        if status.is_success() {
            return Self::decode::<ProfileRow>(response, &path).await;
        }

        debug!(%status, path = %path, "profile query rejected");
        if status.is_client_error() {
            if let Some(message) = Self::error_message(response).await {
                return Err(SupabaseDaoError::Query { path, message });
            }
        }

        Err(SupabaseDaoError::RequestStatus { path, status })
    }
}

impl AccountStore for SupabaseAccountStore {
    fn get_user(&self, access_token: &str) -> BoxFuture<'static, StorageResult<AuthenticatedUser>> {
        let store = self.clone();
        let access_token = access_token.to_string();
        Box::pin(async move {
            store
                .user_for_token(&access_token)
                .await
                .map_err(Into::into)
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, StorageResult<AuthTokens>> {
        let store = self.clone();
        let (email, password) = (email.to_string(), password.to_string());
        Box::pin(async move {
            store
                .password_grant(&email, &password)
                .await
                .map_err(Into::into)
        })
    }

    fn sign_in_anonymously(&self) -> BoxFuture<'static, StorageResult<AuthTokens>> {
        let store = self.clone();
        Box::pin(async move { store.anonymous_sign_up().await.map_err(Into::into) })
    }

    fn fetch_profile(
        &self,
        user: &AuthenticatedUser,
    ) -> BoxFuture<'static, StorageResult<ProfileRow>> {
        let store = self.clone();
        let user = user.clone();
        Box::pin(async move { store.profile_row(&user).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
