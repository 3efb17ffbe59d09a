use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    credential::Credential,
    models::{Post, PostContent, Profile, Researcher, StoreReply},
};

const RESEARCHERS: &str = "researchers";
const POSTS: &str = "posts";

/// StoreError
///
/// Failures of a single record store call. `Rejected` carries the store's own
/// `error` text; it is not stable enough to branch on except through `outcome`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("record store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected record store response: {0}")]
    Decode(#[from] serde_json::Error),
}

// 1. RecordStore Contract
/// RecordStore
///
/// One method per domain operation, each issuing exactly one request to the external
/// record store. Write operations hand back the store's raw reply; callers decide
/// success through `outcome::check`.
///
/// Implemented by `HarperStore` (network) and `MemoryStore` (in-process double).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates an account with the configured default role, using the service account.
    async fn create_user(&self, username: &str, password: &str) -> Result<StoreReply, StoreError>;

    /// Verifies the credential and returns the account information the store holds.
    async fn get_user(&self, credential: &Credential) -> Result<Value, StoreError>;

    async fn create_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError>;

    async fn update_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError>;

    /// Point lookup by username. Empty when no such researcher exists.
    async fn read_researcher(
        &self,
        credential: &Credential,
        username: &str,
    ) -> Result<Vec<Researcher>, StoreError>;

    async fn create_post(
        &self,
        credential: &Credential,
        username: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError>;

    /// Not reachable from any endpoint.
    async fn update_post(
        &self,
        credential: &Credential,
        id: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError>;

    /// Not reachable from any endpoint.
    async fn read_post(&self, credential: &Credential, id: &str) -> Result<Vec<Post>, StoreError>;

    /// Full scan of the posts table, unredacted.
    async fn get_posts(&self, credential: &Credential) -> Result<Vec<Post>, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the gateway across the application state.
pub type StoreState = Arc<dyn RecordStore>;

// 2. The Real Implementation (HarperDB operations API)

/// StoreSettings
///
/// Everything the gateway needs to address the store. Built from `AppConfig`.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    /// The operations endpoint; every call is a POST to this URL.
    pub url: String,
    pub schema: String,
    /// Account allowed to run `add_user`.
    pub service_credential: Credential,
    /// Role id assigned to every new account.
    pub user_role: String,
}

/// HarperStore
///
/// Gateway over the store's JSON operations API. Holds only the fixed endpoint
/// settings and a pooled `reqwest::Client`; no per-request state.
#[derive(Clone)]
pub struct HarperStore {
    client: reqwest::Client,
    settings: StoreSettings,
}

#[derive(Serialize)]
struct Insert<'a, R> {
    operation: &'static str,
    schema: &'a str,
    table: &'static str,
    records: [R; 1],
}

#[derive(Serialize)]
struct ResearcherRow<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct NewPostRow<'a> {
    researcher: &'a str,
    content: &'a str,
    anonymous: bool,
}

#[derive(Serialize)]
struct PostUpdateRow<'a> {
    id: &'a str,
    content: &'a str,
    anonymous: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<Value>,
    message: Option<String>,
}

impl HarperStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn write<R: Serialize>(&self, operation: &'static str, table: &'static str, row: R) -> Insert<'_, R> {
        Insert {
            operation,
            schema: &self.settings.schema,
            table,
            records: [row],
        }
    }

    fn search_by_hash(&self, table: &str, hash: &str) -> Value {
        json!({
            "operation": "search_by_hash",
            "schema": self.settings.schema,
            "table": table,
            "hash_values": [hash],
            "get_attributes": ["*"],
        })
    }

    /// execute
    ///
    /// Sends one operation and decodes the 2xx body as `T`. Non-2xx responses become
    /// `StoreError::Rejected` with the store's `error` text.
    async fn execute<T, B>(
        &self,
        credential: &Credential,
        operation: &'static str,
        body: &B,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        tracing::debug!(operation, "calling record store");

        let response = self
            .client
            .post(&self.settings.url)
            .header(AUTHORIZATION, credential.basic_auth())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| match body.error {
                Some(Value::String(text)) => Some(text),
                Some(other) => Some(other.to_string()),
                None => body.message,
            })
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

        tracing::warn!(
            operation,
            status = status.as_u16(),
            %message,
            "record store rejected request"
        );

        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RecordStore for HarperStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<StoreReply, StoreError> {
        let body = json!({
            "operation": "add_user",
            "role": self.settings.user_role,
            "username": username,
            "password": password,
            "active": true,
        });
        self.execute(&self.settings.service_credential, "add_user", &body)
            .await
    }

    async fn get_user(&self, credential: &Credential) -> Result<Value, StoreError> {
        self.execute(credential, "user_info", &json!({ "operation": "user_info" }))
            .await
    }

    async fn create_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError> {
        let row = ResearcherRow {
            username,
            email: profile.email.as_deref(),
        };
        self.execute(credential, "insert", &self.write("insert", RESEARCHERS, row))
            .await
    }

    async fn update_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError> {
        let row = ResearcherRow {
            username,
            email: profile.email.as_deref(),
        };
        self.execute(credential, "update", &self.write("update", RESEARCHERS, row))
            .await
    }

    async fn read_researcher(
        &self,
        credential: &Credential,
        username: &str,
    ) -> Result<Vec<Researcher>, StoreError> {
        self.execute(credential, "search_by_hash", &self.search_by_hash(RESEARCHERS, username))
            .await
    }

    async fn create_post(
        &self,
        credential: &Credential,
        username: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        let row = NewPostRow {
            researcher: username,
            content: &post.content,
            anonymous: post.anonymous,
        };
        self.execute(credential, "insert", &self.write("insert", POSTS, row))
            .await
    }

    async fn update_post(
        &self,
        credential: &Credential,
        id: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        let row = PostUpdateRow {
            id,
            content: &post.content,
            anonymous: post.anonymous,
        };
        self.execute(credential, "update", &self.write("update", POSTS, row))
            .await
    }

    async fn read_post(&self, credential: &Credential, id: &str) -> Result<Vec<Post>, StoreError> {
        self.execute(credential, "search_by_hash", &self.search_by_hash(POSTS, id))
            .await
    }

    async fn get_posts(&self, credential: &Credential) -> Result<Vec<Post>, StoreError> {
        let body = json!({
            "operation": "search_by_value",
            "schema": self.settings.schema,
            "table": POSTS,
            "search_attribute": "id",
            "search_value": "*",
            "get_attributes": ["*"],
        });
        self.execute(credential, "search_by_value", &body).await
    }
}

// 3. The In-Process Implementation (local runs and tests)

#[derive(Default)]
struct MemoryTables {
    // username -> password
    users: BTreeMap<String, String>,
    researchers: BTreeMap<String, Researcher>,
    // insertion order is listing order
    posts: Vec<Post>,
}

/// MemoryStore
///
/// An in-process `RecordStore` answering with the same messages and error texts as
/// the hosted store, so the API's reply interpretation is exercised unchanged.
/// Every call is counted; tests use `calls()` to prove a request never reached the store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
    calls: AtomicUsize,
    /// When set, every operation fails as if the store were down.
    pub should_fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds an account (and its researcher row) without counting as a call.
    pub fn with_researcher(self, username: &str, password: &str, email: &str) -> Self {
        {
            let mut tables = self.lock();
            tables
                .users
                .insert(username.to_string(), password.to_string());
            tables.researchers.insert(
                username.to_string(),
                Researcher {
                    username: username.to_string(),
                    email: Some(email.to_string()),
                    extra: Map::new(),
                },
            );
        }
        self
    }

    /// Seeds a post verbatim without counting as a call.
    pub fn with_post(self, post: Post) -> Self {
        self.lock().posts.push(post);
        self
    }

    /// Number of operations received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call, then resolves the caller's username from the credential.
    fn begin(&self, credential: Option<&Credential>) -> Result<Option<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(StoreError::Rejected {
                status: 503,
                message: "Mock Store Error: Simulation requested".to_string(),
            });
        }

        let Some(credential) = credential else {
            return Ok(None);
        };

        let tables = self.lock();
        match credential.decode() {
            Some((username, password)) if tables.users.get(&username) == Some(&password) => {
                Ok(Some(username))
            }
            _ => Err(StoreError::Rejected {
                status: 401,
                message: "Login failed".to_string(),
            }),
        }
    }
}

fn hashes_reply(verb: &str, written: Option<&str>, key: &str) -> StoreReply {
    let count = usize::from(written.is_some());
    let mut reply = StoreReply::with_message(format!("{verb} {count} of 1 records"));
    let (done, skipped) = match written {
        Some(hash) => (vec![hash.to_string()], vec![]),
        None => (vec![], vec![key.to_string()]),
    };
    let done_key = if verb == "inserted" { "inserted_hashes" } else { "update_hashes" };
    reply.extra.insert(done_key.to_string(), json!(done));
    reply.extra.insert("skipped_hashes".to_string(), json!(skipped));
    reply
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<StoreReply, StoreError> {
        self.begin(None)?;
        let mut tables = self.lock();
        if tables.users.contains_key(username) {
            return Err(StoreError::Rejected {
                status: 409,
                message: format!("User {username} already exists"),
            });
        }
        tables
            .users
            .insert(username.to_string(), password.to_string());
        Ok(StoreReply::with_message(format!("{username} successfully added")))
    }

    async fn get_user(&self, credential: &Credential) -> Result<Value, StoreError> {
        let username = self.begin(Some(credential))?;
        Ok(json!({
            "username": username,
            "active": true,
            "role": { "role": "researcher" },
        }))
    }

    async fn create_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError> {
        self.begin(Some(credential))?;
        let mut tables = self.lock();
        if tables.researchers.contains_key(username) {
            return Ok(hashes_reply("inserted", None, username));
        }
        tables.researchers.insert(
            username.to_string(),
            Researcher {
                username: username.to_string(),
                email: profile.email.clone(),
                extra: Map::new(),
            },
        );
        Ok(hashes_reply("inserted", Some(username), username))
    }

    async fn update_researcher(
        &self,
        credential: &Credential,
        username: &str,
        profile: &Profile,
    ) -> Result<StoreReply, StoreError> {
        self.begin(Some(credential))?;
        let mut tables = self.lock();
        match tables.researchers.get_mut(username) {
            Some(researcher) => {
                if profile.email.is_some() {
                    researcher.email = profile.email.clone();
                }
                Ok(hashes_reply("updated", Some(username), username))
            }
            None => Ok(hashes_reply("updated", None, username)),
        }
    }

    async fn read_researcher(
        &self,
        credential: &Credential,
        username: &str,
    ) -> Result<Vec<Researcher>, StoreError> {
        self.begin(Some(credential))?;
        Ok(self.lock().researchers.get(username).cloned().into_iter().collect())
    }

    async fn create_post(
        &self,
        credential: &Credential,
        username: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        self.begin(Some(credential))?;
        let id = Uuid::new_v4().to_string();
        self.lock().posts.push(Post {
            id: id.clone(),
            researcher: Some(username.to_string()),
            content: post.content.clone(),
            anonymous: post.anonymous,
            extra: Map::new(),
        });
        Ok(hashes_reply("inserted", Some(id.as_str()), &id))
    }

    async fn update_post(
        &self,
        credential: &Credential,
        id: &str,
        post: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        self.begin(Some(credential))?;
        let mut tables = self.lock();
        match tables.posts.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => {
                existing.content = post.content.clone();
                existing.anonymous = post.anonymous;
                Ok(hashes_reply("updated", Some(id), id))
            }
            None => Ok(hashes_reply("updated", None, id)),
        }
    }

    async fn read_post(&self, credential: &Credential, id: &str) -> Result<Vec<Post>, StoreError> {
        self.begin(Some(credential))?;
        Ok(self
            .lock()
            .posts
            .iter()
            .filter(|post| post.id == id)
            .cloned()
            .collect())
    }

    async fn get_posts(&self, credential: &Credential) -> Result<Vec<Post>, StoreError> {
        self.begin(Some(credential))?;
        Ok(self.lock().posts.clone())
    }
}
