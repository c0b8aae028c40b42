/// Login, logout and session identity lookups.
pub mod auth_service;
/// Confirmation page gate and return action.
pub mod confirmation_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Now-playing song loader.
pub mod now_playing;
/// Profile lookups with error classification.
pub mod profile_service;
/// Idle session and vote slot eviction.
pub mod session_sweeper;
/// Server-Sent Events streaming of auth state.
pub mod sse_service;
/// Account store connection supervisor.
pub mod storage_supervisor;
/// Vote submission seam and its mock implementation.
pub mod submission;
/// Vote page controller.
pub mod vote_service;
/// Votes API: throttled recording, listing and tallies.
pub mod votes_service;
/// Voter progress and favourite songs.
pub mod voter_service;
