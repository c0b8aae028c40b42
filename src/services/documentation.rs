use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Sound Guys voting backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::vote::vote_page,
        crate::routes::vote::manual_vote,
        crate::routes::vote::confirmation_page,
        crate::routes::vote::return_to_voting,
        crate::routes::auth::login_page,
        crate::routes::auth::login,
        crate::routes::auth::guest_login,
        crate::routes::auth::logout,
        crate::routes::auth::auth_events,
        crate::routes::profile::get_profile,
        crate::routes::api::create_vote,
        crate::routes::api::list_votes,
        crate::routes::api::vote_tally,
        crate::routes::api::list_favorites,
        crate::routes::api::toggle_favorite,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::vote::ManualVoteRequest,
            crate::dto::vote::VotePageView,
            crate::dto::vote::ConfirmationView,
            crate::dto::vote::ConfirmationAction,
            crate::dto::vote::ActionKind,
            crate::dto::vote::VoteSubmissionRequest,
            crate::dto::vote::SubmissionResponse,
            crate::dto::vote::TallyEntry,
            crate::dto::voter::VoterStats,
            crate::dto::voter::LocalBadge,
            crate::dto::voter::GlobalBadge,
            crate::dto::voter::FavoriteRequest,
            crate::dto::voter::FavoriteView,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::LoginView,
            crate::dto::sse::AuthStateEvent,
            crate::dao::models::VoteRecord,
            crate::state::vote::VoteValue,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "vote", description = "Vote and confirmation pages"),
        (name = "auth", description = "Login state and auth events"),
        (name = "profile", description = "Bearer-protected user profile"),
        (name = "votes", description = "Votes API"),
    )
)]
pub struct ApiDoc;
