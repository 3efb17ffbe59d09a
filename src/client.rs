//! API client holding the signed-in session.
//!
//! Every authenticated call attaches the session's token as `hdb-token`. Dropping a
//! call's future before it completes aborts the underlying request.

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    auth::TOKEN_HEADER,
    credential,
    models::{
        CreatePostRequest, MessageResponse, Post, PostContent, Profile, ProfileUpdate,
        Researcher, SignInRequest, SignUpRequest, SignUpResponse, UpdateResearcherRequest,
    },
    session::{Session, SessionError, SessionStore},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not signed in")]
    NotSignedIn,

    /// The API answered with a non-success status; `message` is its `message` field.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// ApiClient
///
/// The client-side shell: owns the current `Session` (if any) and its durable store.
/// Created by `open`, which rehydrates whatever session was saved last.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    sessions: SessionStore,
    session: Option<Session>,
}

impl ApiClient {
    pub async fn open(
        base_url: impl Into<String>,
        sessions: SessionStore,
    ) -> Result<Self, ClientError> {
        let session = sessions.load().await?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sessions,
            session,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<&Session, ClientError> {
        let payload = SignUpRequest {
            email: Some(email.to_string()),
            username: username.to_string(),
            password: password.to_string(),
        };
        let signed_up: SignUpResponse =
            send(self.http.post(self.url("/sign-up")).json(&payload)).await?;

        self.replace_session(Session {
            username: signed_up.username,
            token: signed_up.token,
            profile: signed_up.profile,
        })
        .await
    }

    /// Signs in and keeps a session built from the derived credential. The profile
    /// is unknown until the next profile update.
    pub async fn sign_in(&mut self, username: &str, password: &str) -> Result<&Session, ClientError> {
        let payload = SignInRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let _account: serde_json::Value =
            send(self.http.post(self.url("/sign-in")).json(&payload)).await?;

        self.replace_session(Session {
            username: username.to_string(),
            token: credential::encode(username, password).to_string(),
            profile: Profile::default(),
        })
        .await
    }

    /// Forgets the session, in memory and in storage.
    pub async fn sign_out(&mut self) -> Result<(), ClientError> {
        self.session = None;
        self.sessions.clear().await?;
        Ok(())
    }

    /// Updates the signed-in user's email and refreshes the held profile from the
    /// record the server returns.
    pub async fn update_profile(&mut self, email: &str) -> Result<Researcher, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotSignedIn)?;
        let payload = UpdateResearcherRequest {
            username: session.username.clone(),
            profile: ProfileUpdate {
                email: email.to_string(),
            },
        };
        let updated: Researcher = self
            .authenticated(self.http.post(self.url("/update-researcher")), &payload)
            .await?;

        let mut refreshed = session.clone();
        refreshed.profile = Profile {
            email: updated.email.clone(),
        };
        self.replace_session(refreshed).await?;
        Ok(updated)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        let token = &self.session.as_ref().ok_or(ClientError::NotSignedIn)?.token;
        send(self.http.get(self.url("/posts")).header(TOKEN_HEADER, token)).await
    }

    /// Publishes a post as the signed-in user. Returns the server's confirmation.
    pub async fn create_post(&self, content: &str, anonymous: bool) -> Result<String, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotSignedIn)?;
        let payload = CreatePostRequest {
            username: session.username.clone(),
            post: PostContent {
                content: content.to_string(),
                anonymous,
            },
        };
        let created: MessageResponse = self
            .authenticated(self.http.post(self.url("/create-post")), &payload)
            .await?;
        Ok(created.message)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authenticated<B, T>(&self, request: RequestBuilder, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = &self.session.as_ref().ok_or(ClientError::NotSignedIn)?.token;
        send(request.header(TOKEN_HEADER, token).json(body)).await
    }

    async fn replace_session(&mut self, session: Session) -> Result<&Session, ClientError> {
        self.sessions.save(&session).await?;
        Ok(self.session.insert(session))
    }
}

/// send
///
/// Runs the request; a non-success status becomes `ClientError::Api` with the
/// server's `message` (or the status reason when there is none).
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(ClientError::Api { status, message })
}
