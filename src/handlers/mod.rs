// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Elevated (JWT auth + admin permissions)
//
// The JWT middleware only establishes who the caller is. Everything past
// authentication is decided per operation by the authorization gate, so
// "elevated" names routes whose gate requires system-level permissions.

pub mod elevated;
pub mod protected;
pub mod public;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let config = state.config;

    let mut app = Router::new()
        // Public
        .merge(public_routes())
        // Protected API (JWT required, per-operation gates inside)
        .merge(
            Router::new()
                .merge(auth_routes())
                .merge(organization_routes())
                .merge(role_routes())
                .merge(admin_routes())
                .route_layer(middleware::from_fn(jwt_auth_middleware)),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        app = app.layer(cors_layer(config));
    }

    app.layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.security.cors_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/permissions", get(auth::permissions))
}

fn organization_routes() -> Router<AppState> {
    use protected::organizations;

    Router::new()
        .route(
            "/api/organizations",
            get(organizations::list).post(organizations::create),
        )
        .route(
            "/api/organizations/:id",
            get(organizations::show).patch(organizations::update),
        )
        .route("/api/organizations/:id/roles", get(organizations::roles))
}

fn role_routes() -> Router<AppState> {
    use protected::roles;

    Router::new()
        .route("/api/roles/assign", post(roles::assign))
        .route("/api/roles/revoke", post(roles::revoke))
}

fn admin_routes() -> Router<AppState> {
    use elevated::admin;

    Router::new()
        .route("/api/admin/users/bulk", post(admin::bulk))
        .route("/api/admin/audit", get(admin::audit))
}
