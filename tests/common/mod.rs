#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use open_research_api::{
    AppConfig, AppState, create_router,
    credential::Credential,
    models::{Post, PostContent, Profile, Researcher, StoreReply},
    store::{RecordStore, StoreError, StoreState},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

// --- SCRIPTED STORE ---

// Answers every operation with a pre-canned reply, so tests can put the API in
// situations the in-memory store never produces (partial sign-up, odd messages).
pub struct ScriptedStore {
    pub add_user_reply: StoreReply,
    pub insert_reply: StoreReply,
    pub update_reply: StoreReply,
    pub user_info: Result<Value, (u16, String)>,
    pub researchers: Vec<Researcher>,
    pub posts: Vec<Post>,
    pub calls: AtomicUsize,
}

impl Default for ScriptedStore {
    fn default() -> Self {
        ScriptedStore {
            add_user_reply: StoreReply::with_message("successfully added"),
            insert_reply: StoreReply::with_message("inserted 1 of 1 records"),
            update_reply: StoreReply::with_message("updated 1 of 1 records"),
            user_info: Ok(json!({ "username": "alice", "active": true })),
            researchers: vec![],
            posts: vec![],
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn create_user(&self, _u: &str, _p: &str) -> Result<StoreReply, StoreError> {
        self.tick();
        Ok(self.add_user_reply.clone())
    }
    async fn get_user(&self, _c: &Credential) -> Result<Value, StoreError> {
        self.tick();
        self.user_info
            .clone()
            .map_err(|(status, message)| StoreError::Rejected { status, message })
    }
    async fn create_researcher(
        &self,
        _c: &Credential,
        _u: &str,
        _p: &Profile,
    ) -> Result<StoreReply, StoreError> {
        self.tick();
        Ok(self.insert_reply.clone())
    }
    async fn update_researcher(
        &self,
        _c: &Credential,
        _u: &str,
        _p: &Profile,
    ) -> Result<StoreReply, StoreError> {
        self.tick();
        Ok(self.update_reply.clone())
    }
    async fn read_researcher(&self, _c: &Credential, _u: &str) -> Result<Vec<Researcher>, StoreError> {
        self.tick();
        Ok(self.researchers.clone())
    }
    async fn create_post(
        &self,
        _c: &Credential,
        _u: &str,
        _p: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        self.tick();
        Ok(self.insert_reply.clone())
    }
    async fn update_post(
        &self,
        _c: &Credential,
        _id: &str,
        _p: &PostContent,
    ) -> Result<StoreReply, StoreError> {
        self.tick();
        Ok(self.update_reply.clone())
    }
    async fn read_post(&self, _c: &Credential, _id: &str) -> Result<Vec<Post>, StoreError> {
        self.tick();
        Ok(self.posts.clone())
    }
    async fn get_posts(&self, _c: &Credential) -> Result<Vec<Post>, StoreError> {
        self.tick();
        Ok(self.posts.clone())
    }
}

// --- APP HELPERS ---

pub fn app(store: StoreState) -> Router {
    create_router(AppState {
        store,
        config: AppConfig::default(),
    })
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("hdb-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("hdb-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn post(id: &str, researcher: &str, content: &str, anonymous: bool) -> Post {
    Post {
        id: id.to_string(),
        researcher: Some(researcher.to_string()),
        content: content.to_string(),
        anonymous,
        ..Default::default()
    }
}
