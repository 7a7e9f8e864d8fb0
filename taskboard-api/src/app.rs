/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum router
/// with all routes and middleware.

use crate::{
    config::{Config, StoreBackend, StoreConfig},
    identity::{GoogleProvider, IdentityProviders},
    middleware::security::SecurityHeadersLayer,
    routes,
};
use anyhow::Context as _;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::middleware::{require_session_middleware, session_middleware},
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, DatabaseConfig as PoolConfig},
    },
    flows::{AccessGuard, LandingStats, PublicTaskFlow, TaskRepository},
    redis::{ChangeFeed, RedisClient, RedisConfig},
    store::{memory::MemoryStore, postgres::PgStore, DocumentStore},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request, so all fields should be cheap to clone
/// (Arc, or handles that wrap one).
#[derive(Clone)]
pub struct AppState {
    /// Document store shared by every flow
    pub store: Arc<dyn DocumentStore>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Sign-in providers by name
    pub providers: IdentityProviders,

    /// Cached landing counts
    pub landing: Arc<LandingStats>,

    /// Dashboard flow
    pub tasks: TaskRepository,

    /// Public task page flow
    pub public_tasks: PublicTaskFlow,

    /// Page access decisions
    pub guard: AccessGuard,
}

impl AppState {
    /// Wires the flows onto a store
    pub fn new(store: Arc<dyn DocumentStore>, config: Config, providers: IdentityProviders) -> Self {
        let policy = config.flows.delete_policy;

        Self {
            landing: Arc::new(LandingStats::new(Arc::clone(&store), config.flows.landing_refresh())),
            tasks: TaskRepository::new(Arc::clone(&store), policy, config.api.public_url.clone()),
            public_tasks: PublicTaskFlow::new(Arc::clone(&store), policy),
            guard: AccessGuard::new(Arc::clone(&store)),
            store,
            config: Arc::new(config),
            providers,
        }
    }
}

/// Opens the configured store backend
///
/// The postgres backend creates the database if needed and applies pending
/// migrations before the store is handed out.
pub async fn connect_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("postgres backend needs database settings")?;
            let redis_url = config
                .redis_url
                .clone()
                .context("postgres backend needs REDIS_URL")?;

            ensure_database_exists(&database.url)
                .await
                .context("Failed to ensure database exists")?;

            let mut pool_config = PoolConfig::new(database.url.clone());
            pool_config.max_connections = database.max_connections;
            let pool = create_pool(pool_config)
                .await
                .context("Failed to create database pool")?;
            run_migrations(&pool).await.context("Failed to run migrations")?;

            let redis = RedisClient::new(RedisConfig::new(redis_url))
                .await
                .context("Failed to connect to Redis")?;
            let feed = ChangeFeed::new(redis, config.project_id.clone());

            tracing::info!(project_id = %config.project_id, "PostgreSQL store ready");
            Ok(Arc::new(PgStore::new(pool, feed, config.project_id.clone())))
        }
    }
}

/// Registers the sign-in providers that have credentials
pub fn build_providers(config: &Config) -> anyhow::Result<IdentityProviders> {
    let mut providers = IdentityProviders::new();

    if let Some(google) = &config.google {
        providers = providers.with(Arc::new(GoogleProvider::new(google)?));
    }

    if providers.is_empty() {
        tracing::warn!("No identity provider configured; sign-in is disabled");
    }

    Ok(providers)
}

/// Resolves the session on every request
async fn session_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    session_middleware(state.config.jwt.secret.clone(), req, next).await
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Builds the Axum router with all routes and middleware
///
/// # Routes
///
/// - `GET /` - Landing counts
/// - `GET /404` - Not-found page
/// - `GET /health` - Health check
/// - `/api/auth/*` - Sign-in, callback, sign-out and session
/// - `/dashboard*` - The signed-in user's tasks
/// - `/task/:id*` - Public task page and its comments
///
/// # Middleware
///
/// - Session resolution on every route
/// - Session required on delete and share routes
/// - Tracing, CORS and security headers
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signin/:provider", get(routes::auth::signin))
        .route("/callback/:provider", get(routes::auth::callback))
        .route("/signout", post(routes::auth::signout))
        .route("/session", get(routes::auth::session));

    let page_routes = Router::new()
        .route("/", get(routes::landing::landing))
        .route("/404", get(routes::landing::not_found))
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/dashboard/tasks", post(routes::dashboard::create_task))
        .route("/dashboard/tasks/stream", get(routes::dashboard::stream_tasks))
        .route("/task/:id", get(routes::task::task_page))
        .route("/task/:id/comments", post(routes::task::add_comment))
        .route("/task/:id/comments/stream", get(routes::task::stream_comments));

    let session_routes = Router::new()
        .route("/dashboard/tasks/:id", delete(routes::dashboard::delete_task))
        .route("/dashboard/tasks/:id/share", post(routes::dashboard::share_task))
        .route(
            "/task/:id/comments/:comment_id",
            delete(routes::task::delete_comment),
        )
        .route_layer(middleware::from_fn(require_session_middleware));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/auth", auth_routes)
        .merge(page_routes)
        .merge(session_routes)
        .fallback(routes::landing::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
