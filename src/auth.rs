use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::{credential::Credential, error::ApiError};

/// Header carrying the client's credential on every authenticated request.
pub const TOKEN_HEADER: &str = "hdb-token";

/// HdbToken Extractor Result
///
/// The credential presented by the caller. It is not verified here: the record store
/// is the source of truth and rejects bad credentials on the first call made with it.
#[derive(Debug, Clone)]
pub struct HdbToken(pub Credential);

/// HdbToken Extractor Implementation
///
/// Usable as a handler argument on any authenticated route. A missing, empty or
/// non-ASCII header is rejected as a validation error (400) before the handler runs.
impl<S> FromRequestParts<S> for HdbToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(|token| HdbToken(Credential::from_token(token)))
            .ok_or_else(|| ApiError::Validation(format!("Missing required header: {TOKEN_HEADER}")))
    }
}

impl HdbToken {
    /// ensure_owner
    ///
    /// Rejects a request acting on `username` with a credential that decodes to someone
    /// else. Tokens that do not decode are left for the store to judge.
    pub fn ensure_owner(&self, username: &str) -> Result<(), ApiError> {
        match self.0.decode() {
            Some((owner, _)) if owner != username => Err(ApiError::Validation(format!(
                "Credential does not belong to {username}"
            ))),
            _ => Ok(()),
        }
    }
}

/// ValidJson
///
/// `Json<T>` whose rejections (bad content type, malformed JSON, missing required
/// fields) become `ApiError::Validation`, so they share the `{message}` error body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ValidJson(value))
    }
}
