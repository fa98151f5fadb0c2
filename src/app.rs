//! Router assembly and shared application state.

use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::handlers::{admin, auth, contact, events, notifications, users};
use crate::mail::Notifier;
use crate::media::MediaStore;
use crate::middleware::auth::{require_admin, require_member, require_organizer};
use crate::store::Store;

/// Everything a request handler can reach. Constructed once at startup and
/// cloned per request; no other shared mutable state exists.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub notifier: Notifier,
    pub media: MediaStore,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for MediaStore {
    fn from_ref(state: &AppState) -> Self {
        state.media.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let server = state.config.server.clone();

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes(&state))
        // Uploaded media is served statically by generated filename.
        .nest_service("/media", ServeDir::new(&server.media_dir))
        // SPA host: static assets with an index.html fallback.
        .fallback_service(
            ServeDir::new(&server.public_dir)
                .fallback(ServeFile::new(server.public_dir.join("index.html"))),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let tokens = &state.tokens;

    Router::new()
        // Public auth flows: token and OTP acquisition
        .route("/auth/login", get(auth::login))
        .route("/auth/login/:id", get(auth::login))
        .route("/auth/generate_otp", get(auth::generate_otp))
        .route("/auth/generate_otp/:id", get(auth::generate_otp))
        .route("/auth/verify_otp", get(auth::verify_otp))
        .route("/auth/verify_otp/:id", get(auth::verify_otp))
        // Users
        .route("/users", get(users::list).post(users::register))
        .route("/users/:id", get(users::get))
        .route(
            "/users/:id",
            patch(users::update).route_layer(from_fn_with_state(tokens.clone(), require_member)),
        )
        .route(
            "/users/:id",
            delete(users::remove).route_layer(from_fn_with_state(tokens.clone(), require_admin)),
        )
        // Events
        .route("/events", get(events::list))
        .route(
            "/events",
            post(events::create).route_layer(from_fn_with_state(tokens.clone(), require_organizer)),
        )
        .route("/events/:id", get(events::get))
        .route(
            "/events/:id",
            patch(events::update).route_layer(from_fn_with_state(tokens.clone(), require_member)),
        )
        .route(
            "/events/:id",
            delete(events::remove)
                .route_layer(from_fn_with_state(tokens.clone(), require_organizer)),
        )
        // Notifications, embedded on account documents
        .route(
            "/notifications/:id",
            get(notifications::get)
                .patch(notifications::update)
                .route_layer(from_fn_with_state(tokens.clone(), require_member)),
        )
        // Admin accounts
        .route(
            "/admin/:id",
            get(admin::get).route_layer(from_fn_with_state(tokens.clone(), require_admin)),
        )
        // Contact form
        .route("/contact", post(contact::submit))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now.to_rfc3339(),
                "database": "ok",
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now.to_rfc3339(),
                "database_error": e.to_string(),
            })),
        ),
    }
}
