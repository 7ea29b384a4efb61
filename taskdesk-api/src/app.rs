/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::{app::{build_router, AppState}, config::Config};
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
///
/// let app = build_router(AppState::new(pool, config));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use taskdesk_shared::auth::middleware::resolve_session;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /api
/// ├── GET    /health
/// ├── /auth
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── POST /logout                  (session)
/// │   └── GET  /me                      (session)
/// ├── GET    /users                     (session)
/// ├── /tasks
/// │   ├── GET    /                      (?assigneeId=)
/// │   ├── POST   /                      (session, not Staff)
/// │   ├── GET    /:id
/// │   ├── PUT    /:id                   (session, owner/manager)
/// │   ├── DELETE /:id                   (session, owner/manager)
/// │   ├── PATCH  /:id/status            (session)
/// │   ├── PATCH  /:id/submit            (session, staff assignee)
/// │   ├── PATCH  /:id/approve           (session, owner/manager)
/// │   ├── PATCH  /:id/deny              (session, owner/manager)
/// │   ├── GET    /:id/comments
/// │   └── POST   /:id/comments          (session)
/// └── /notifications
///     ├── GET    /                      (session)
///     └── PATCH  /:id/read              (session)
/// ```
///
/// # Middleware Stack
///
/// Outermost first: CORS, request tracing, session resolution. Session
/// resolution never rejects; handlers that need a login extract
/// `AuthContext` and fail with 401 without one.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_status))
        .route("/:id/submit", patch(routes::tasks::submit_for_review))
        .route("/:id/approve", patch(routes::tasks::approve))
        .route("/:id/deny", patch(routes::tasks::deny))
        .route(
            "/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id/read", patch(routes::notifications::mark_read));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", get(routes::users::list_users))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes);

    // Reflects requested headers/methods; credentials are never allowed with `Any`
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.db.clone(),
            resolve_session,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
