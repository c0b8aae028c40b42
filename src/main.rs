//! Sound Vote Back binary entrypoint wiring the REST routes, SSE stream and hosted account store.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use sound_vote_back::{config::AppConfig, routes, services::session_sweeper, state::AppState};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    spawn_account_store(&app_state);
    tokio::spawn(session_sweeper::run(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the supervisor that keeps the hosted account store connected.
#[cfg(feature = "supabase-store")]
fn spawn_account_store(state: &sound_vote_back::state::SharedState) {
    use std::sync::Arc;

    use sound_vote_back::{
        dao::{
            account_store::AccountStore,
            supabase::{SupabaseAccountStore, SupabaseConfig},
        },
        services::storage_supervisor,
    };

    let config = match SupabaseConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "account store not configured; running in degraded mode");
            return;
        }
    };

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = config.clone();
        async move {
            let store = SupabaseAccountStore::connect(config).await?;
            Ok(Arc::new(store) as Arc<dyn AccountStore>)
        }
    }));
}

#[cfg(not(feature = "supabase-store"))]
fn spawn_account_store(_state: &sound_vote_back::state::SharedState) {
    warn!("built without an account store backend; running in degraded mode");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: sound_vote_back::state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
