/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use dothe2_api::app::{build_router, AppState};
/// use dothe2_api::config::Config;
/// use dothe2_shared::services::Services;
///
/// # fn example(services: Services) -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let app = build_router(AppState::new(services, config));
/// # Ok(())
/// # }
/// ```
use crate::{config::Config, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use dothe2_shared::auth::middleware::create_jwt_middleware;
use dothe2_shared::services::Services;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Auth, quadrant and task services
    pub services: Services,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(services: Services, config: Config) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                      # public
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /request-login      # public
///     │   ├── POST /verify-code        # public
///     │   ├── GET  /verify?token=      # public, redirects
///     │   └── GET  /me                 # JWT
///     ├── /quadrants/                  # JWT
///     │   ├── GET, POST /
///     │   └── GET, PUT, DELETE /:id
///     └── /tasks/                      # JWT
///         ├── GET, POST /
///         ├── GET, PUT, DELETE /:id
///         ├── PATCH /:id/quadrant
///         └── PATCH /:id/complete
/// ```
///
/// Layers, outermost first: CORS, request tracing, then JWT authentication
/// on the protected groups.
pub fn build_router(state: AppState) -> Router {
    let jwt_layer = middleware::from_fn(create_jwt_middleware(state.jwt_secret().to_owned()));

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/request-login", post(routes::auth::request_login))
        .route("/verify-code", post(routes::auth::verify_code))
        .route("/verify", get(routes::auth::verify_magic_link));

    let protected_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(jwt_layer.clone());

    let quadrant_routes = Router::new()
        .route(
            "/",
            get(routes::quadrants::list_quadrants).post(routes::quadrants::create_quadrant),
        )
        .route(
            "/:id",
            get(routes::quadrants::get_quadrant)
                .put(routes::quadrants::update_quadrant)
                .delete(routes::quadrants::delete_quadrant),
        )
        .layer(jwt_layer.clone());

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
        .route("/:id/quadrant", patch(routes::tasks::move_task))
        .route("/:id/complete", patch(routes::tasks::toggle_task_completion))
        .layer(jwt_layer);

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/quadrants", quadrant_routes)
        .nest("/tasks", task_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
