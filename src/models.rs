use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Records (Mapped to the Record Store) ---

/// Profile
///
/// The editable part of a researcher record. `email` is optional at sign-up and
/// omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
}

/// Researcher
///
/// A row of the `researchers` table, keyed by `username`.
/// Store-managed attributes (timestamps and the like) are carried in `extra` so the
/// record is returned to the client as the store produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Researcher {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
    #[serde(flatten)]
    #[ts(skip)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

/// Post
///
/// A row of the `posts` table. `researcher` is the author's username and is
/// `None` once redacted; `None` serializes as an absent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub researcher: Option<String>,
    pub content: String,
    pub anonymous: bool,
    #[serde(flatten)]
    #[ts(skip)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

/// PostContent
///
/// The client-authored part of a post, used for both creation and (internal) update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostContent {
    pub content: String,
    pub anonymous: bool,
}

/// StoreReply
///
/// The raw object the record store answers write operations with. Only `message`
/// is interpreted (see `outcome`); everything else is kept so a failed reply can be
/// forwarded to the client verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct StoreReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

impl StoreReply {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            extra: Map::new(),
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input payload for POST /sign-up. `username` and `password` are required;
/// the password is forwarded to the store and never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
    pub username: String,
    pub password: String,
}

/// SignInRequest
///
/// Input payload for POST /sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// ProfileUpdate
///
/// Profile fields accepted by POST /update-researcher. Unlike sign-up, `email` is required.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileUpdate {
    pub email: String,
}

/// UpdateResearcherRequest
///
/// Input payload for POST /update-researcher.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateResearcherRequest {
    pub username: String,
    pub profile: ProfileUpdate,
}

/// CreatePostRequest
///
/// Input payload for POST /create-post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatePostRequest {
    pub username: String,
    pub post: PostContent,
}

// --- Response Payloads (Output Schemas) ---

/// SignUpResponse
///
/// The session a client keeps after a successful sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpResponse {
    pub token: String,
    pub username: String,
    pub profile: Profile,
}

/// MessageResponse
///
/// `{ "message": ... }`, used for pings, confirmations and every locally produced error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
