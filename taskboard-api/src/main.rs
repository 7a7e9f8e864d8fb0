//! # Taskboard+ API Server
//!
//! Serves the landing page counts, the signed-in dashboard, public task
//! pages with comments, and OAuth sign-in. Live listings are pushed to
//! clients as server-sent events.
//!
//! ## Usage
//!
//! ```bash
//! STORE_BACKEND=memory JWT_SECRET=... cargo run -p taskboard-api
//! ```

use taskboard_api::app::{build_providers, build_router, connect_store, AppState};
use taskboard_api::config::Config;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard+ API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    tracing::info!(
        backend = %config.store.backend,
        project_id = %config.store.project_id,
        delete_policy = %config.flows.delete_policy,
        "Configuration loaded"
    );

    let store = connect_store(&config.store).await?;
    let providers = build_providers(&config)?;
    let bind_address = config.bind_address();

    let app = build_router(AppState::new(store, config, providers));

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
