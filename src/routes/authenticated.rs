use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here requires the `hdb-token` header. The router is wrapped in the
/// token middleware (see `create_router`), and each handler also takes `HdbToken`
/// to forward the credential to the store.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /update-researcher
        // Updates the caller's profile and returns the re-read record.
        .route("/update-researcher", post(handlers::update_researcher))
        // GET /posts
        // Lists all posts with anonymous authors redacted.
        .route("/posts", get(handlers::get_posts))
        // POST /create-post
        .route("/create-post", post(handlers::create_post))
}
