use axum::{Json, extract::State};
use serde_json::Value;

use crate::{
    auth::{HdbToken, ValidJson},
    credential,
    error::{ApiError, ApiResult},
    models::{
        CreatePostRequest, MessageResponse, Post, Profile, Researcher, SignInRequest,
        SignUpRequest, SignUpResponse, StoreReply, UpdateResearcherRequest,
    },
    outcome::{self, Expectation},
    redact::redact_anonymous,
    store::StoreState,
};

const EMPTY_CREDENTIALS: &str = "Username and Password cannot be empty";

// --- Handlers ---

/// ping
///
/// [Public Route] Liveness check.
#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Alive", body = MessageResponse))
)]
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}

/// sign_up
///
/// [Public Route] Creates the account, then the researcher profile, using the
/// credential derived from the submitted pair.
///
/// *Partial failure*: the account is not removed when the profile insert fails. The
/// client receives the profile failure and no token.
#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Signed up", body = SignUpResponse),
        (status = 400, description = "Validation or store failure", body = MessageResponse)
    )
)]
pub async fn sign_up(
    State(store): State<StoreState>,
    ValidJson(payload): ValidJson<SignUpRequest>,
) -> ApiResult<Json<SignUpResponse>> {
    let SignUpRequest {
        email,
        username,
        password,
    } = payload;

    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(EMPTY_CREDENTIALS.to_string()));
    }

    let created = store.create_user(&username, &password).await?;
    outcome::check(Expectation::UserAdded, created).map_err(ApiError::StoreFailure)?;

    let token = credential::encode(&username, &password);
    let profile = Profile { email };

    let inserted = store.create_researcher(&token, &username, &profile).await;
    let profile_result = match inserted {
        Ok(reply) => outcome::check(Expectation::InsertedOne, reply).map_err(ApiError::StoreFailure),
        Err(error) => Err(ApiError::from(error)),
    };
    if let Err(error) = profile_result {
        tracing::warn!(%username, %error, "account created but researcher profile was not");
        return Err(error);
    }

    tracing::info!(%username, "researcher signed up");

    Ok(Json(SignUpResponse {
        token: token.to_string(),
        username,
        profile,
    }))
}

/// sign_in
///
/// [Public Route] Verifies the derived credential by fetching the account from the
/// store. A rejected login yields the generic message; any other failure is a 500.
#[utoipa::path(
    post,
    path = "/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Account information as held by the store"),
        (status = 400, description = "Invalid login", body = MessageResponse)
    )
)]
pub async fn sign_in(
    State(store): State<StoreState>,
    ValidJson(payload): ValidJson<SignInRequest>,
) -> ApiResult<Json<Value>> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(EMPTY_CREDENTIALS.to_string()));
    }

    let token = credential::encode(&payload.username, &payload.password);

    match store.get_user(&token).await {
        Ok(account) => Ok(Json(account)),
        Err(error) if outcome::is_login_failure(&error) => Err(ApiError::InvalidLogin),
        Err(error) => Err(ApiError::Unexpected(error)),
    }
}

/// update_researcher
///
/// [Authenticated Route] Updates the caller's profile and returns the stored record
/// as re-read after the update.
#[utoipa::path(
    post,
    path = "/update-researcher",
    request_body = UpdateResearcherRequest,
    params(("hdb-token" = String, Header, description = "base64 of username:password")),
    responses(
        (status = 200, description = "Updated profile", body = Researcher),
        (status = 400, description = "Store reply", body = StoreReply)
    )
)]
pub async fn update_researcher(
    token: HdbToken,
    State(store): State<StoreState>,
    ValidJson(payload): ValidJson<UpdateResearcherRequest>,
) -> ApiResult<Json<Researcher>> {
    let UpdateResearcherRequest { username, profile } = payload;

    if username.is_empty() {
        return Err(ApiError::Validation(
            "User token and username are required".to_string(),
        ));
    }
    token.ensure_owner(&username)?;

    let profile = Profile {
        email: Some(profile.email),
    };

    let updated = store.update_researcher(&token.0, &username, &profile).await?;
    outcome::check(Expectation::UpdatedOne, updated).map_err(ApiError::StoreFailure)?;

    store
        .read_researcher(&token.0, &username)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::Validation(format!("Researcher {username} not found")))
}

/// get_posts
///
/// [Authenticated Route] Lists every post. The author of each anonymous post is
/// removed before the list leaves the server.
#[utoipa::path(
    get,
    path = "/posts",
    params(("hdb-token" = String, Header, description = "base64 of username:password")),
    responses((status = 200, description = "All posts, anonymous authors redacted", body = [Post]))
)]
pub async fn get_posts(
    token: HdbToken,
    State(store): State<StoreState>,
) -> ApiResult<Json<Vec<Post>>> {
    let posts = store.get_posts(&token.0).await?;
    Ok(Json(redact_anonymous(posts)))
}

/// create_post
///
/// [Authenticated Route] Publishes a post authored by `username`.
#[utoipa::path(
    post,
    path = "/create-post",
    request_body = CreatePostRequest,
    params(("hdb-token" = String, Header, description = "base64 of username:password")),
    responses(
        (status = 200, description = "Created", body = MessageResponse),
        (status = 400, description = "Store reply", body = StoreReply)
    )
)]
pub async fn create_post(
    token: HdbToken,
    State(store): State<StoreState>,
    ValidJson(payload): ValidJson<CreatePostRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let CreatePostRequest { username, post } = payload;
    token.ensure_owner(&username)?;

    let inserted = store.create_post(&token.0, &username, &post).await?;
    outcome::check(Expectation::InsertedOne, inserted).map_err(ApiError::StoreFailure)?;

    tracing::info!(%username, anonymous = post.anonymous, "post created");

    Ok(Json(MessageResponse::new("Successfully created post")))
}
