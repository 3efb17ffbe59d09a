use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, request::Parts as RequestParts},
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Server side: gateway, reply interpretation and the HTTP surface.
pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod handlers;
pub mod models;
pub mod outcome;
pub mod redact;
pub mod store;

// Client side: the session holder and the API client that uses it.
pub mod client;
pub mod session;

pub mod routes;
use auth::HdbToken;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use store::{HarperStore, MemoryStore, StoreState};

/// ApiDoc
///
/// OpenAPI document for every endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ping, handlers::sign_up, handlers::sign_in,
        handlers::update_researcher, handlers::get_posts, handlers::create_post
    ),
    components(
        schemas(
            models::Profile, models::Researcher, models::Post, models::PostContent,
            models::StoreReply, models::SignUpRequest, models::SignInRequest,
            models::ProfileUpdate, models::UpdateResearcherRequest,
            models::CreatePostRequest, models::SignUpResponse, models::MessageResponse,
        )
    ),
    tags(
        (name = "open-research", description = "Open Research Platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by all requests: the store gateway and
/// the loaded configuration. Nothing in it changes per request.
#[derive(Clone)]
pub struct AppState {
    /// Gateway to the external record store.
    pub store: StoreState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// store_from_config
///
/// The HarperDB gateway when a store URL is configured, otherwise the in-memory store
/// (only possible locally: production config requires `HDB_URL`).
pub fn store_from_config(config: &AppConfig) -> StoreState {
    match config.store_settings() {
        Some(settings) => {
            tracing::info!(url = %settings.url, schema = %settings.schema, "using record store");
            Arc::new(HarperStore::new(settings))
        }
        None => {
            tracing::warn!("HDB_URL not set, using the in-memory record store");
            Arc::new(MemoryStore::new())
        }
    }
}

/// token_middleware
///
/// Rejects requests to authenticated routes that carry no `hdb-token`, before
/// their bodies are parsed. The `HdbToken` extractor performs the check.
async fn token_middleware(_token: HdbToken, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, applies the scoped token middleware and the global
/// observability and CORS layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin_pattern);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn(token_middleware)),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// cors_layer
///
/// Allows any method and header, but only from origins containing `pattern`
/// (by default, browsers served from localhost).
fn cors_layer(pattern: &str) -> CorsLayer {
    let pattern = pattern.to_string();
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &RequestParts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin.contains(pattern.as_str()))
            },
        ))
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, uri and the request id, so every log line of a
/// request is correlated. Request headers are not recorded (they carry credentials).
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
