use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential: liveness and the two identity flows
/// that produce one.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /ping
        .route("/ping", get(handlers::ping))
        // POST /sign-up
        // Creates the account and its researcher profile, returns the session token.
        .route("/sign-up", post(handlers::sign_up))
        // POST /sign-in
        // Verifies username/password against the store and returns the account.
        .route("/sign-in", post(handlers::sign_in))
}
