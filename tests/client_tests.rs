mod common;

use axum::http::StatusCode;
use common::{app, serve};
use open_research_api::{
    MemoryStore,
    client::{ApiClient, ClientError},
    credential,
    models::Profile,
    session::SessionStore,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    base_url: String,
    dir: TempDir,
}

impl Harness {
    async fn start(store: MemoryStore) -> Self {
        Self {
            base_url: serve(app(Arc::new(store))).await,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.dir.path().join("session.json"))
    }

    async fn client(&self) -> ApiClient {
        ApiClient::open(&self.base_url, self.sessions()).await.unwrap()
    }
}

#[tokio::test]
async fn test_sign_up_persists_session_across_restarts() {
    let harness = Harness::start(MemoryStore::new()).await;

    let mut client = harness.client().await;
    assert!(client.session().is_none());

    let session = client.sign_up("a@b.com", "alice", "pw1").await.unwrap();
    assert_eq!(session.username, "alice");
    assert_eq!(session.token, credential::encode("alice", "pw1").to_string());
    assert_eq!(session.profile.email.as_deref(), Some("a@b.com"));

    let reopened = harness.client().await;
    assert_eq!(reopened.session(), client.session());
}

#[tokio::test]
async fn test_posting_and_listing_hides_anonymous_authors() {
    let harness = Harness::start(MemoryStore::new()).await;
    let mut client = harness.client().await;
    client.sign_up("a@b.com", "alice", "pw1").await.unwrap();

    let confirmation = client.create_post("hidden", true).await.unwrap();
    assert_eq!(confirmation, "Successfully created post");
    client.create_post("signed", false).await.unwrap();

    let posts = client.list_posts().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].content, "hidden");
    assert_eq!(posts[0].researcher, None);
    assert_eq!(posts[1].researcher.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_update_profile_refreshes_held_and_stored_session() {
    let harness = Harness::start(MemoryStore::new()).await;
    let mut client = harness.client().await;
    client.sign_up("a@b.com", "alice", "pw1").await.unwrap();

    let updated = client.update_profile("new@b.com").await.unwrap();
    assert_eq!(updated.username, "alice");
    assert_eq!(updated.email.as_deref(), Some("new@b.com"));

    let expected = Profile {
        email: Some("new@b.com".to_string()),
    };
    assert_eq!(client.session().unwrap().profile, expected);

    let stored = harness.sessions().load().await.unwrap().unwrap();
    assert_eq!(stored.profile, expected);
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let harness = Harness::start(MemoryStore::new()).await;
    let mut client = harness.client().await;
    client.sign_up("a@b.com", "alice", "pw1").await.unwrap();

    client.sign_out().await.unwrap();

    assert!(client.session().is_none());
    assert!(harness.client().await.session().is_none());
}

#[tokio::test]
async fn test_authenticated_calls_require_a_session() {
    let harness = Harness::start(MemoryStore::new()).await;
    let mut client = harness.client().await;

    assert!(matches!(
        client.list_posts().await,
        Err(ClientError::NotSignedIn)
    ));
    assert!(matches!(
        client.create_post("hello", false).await,
        Err(ClientError::NotSignedIn)
    ));
    assert!(matches!(
        client.update_profile("a@b.com").await,
        Err(ClientError::NotSignedIn)
    ));
}

#[tokio::test]
async fn test_sign_in_keeps_derived_token() {
    let store = MemoryStore::new().with_researcher("alice", "pw1", "a@b.com");
    let harness = Harness::start(store).await;
    let mut client = harness.client().await;

    let session = client.sign_in("alice", "pw1").await.unwrap();

    assert_eq!(session.token, credential::encode("alice", "pw1").to_string());
    assert_eq!(session.profile, Profile::default());
    assert_eq!(client.list_posts().await.unwrap(), vec![]);
}

#[tokio::test]
async fn test_wrong_password_surfaces_generic_message() {
    let store = MemoryStore::new().with_researcher("alice", "pw1", "a@b.com");
    let harness = Harness::start(store).await;
    let mut client = harness.client().await;

    let error = client.sign_in("alice", "wrong").await.unwrap_err();

    match error {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "Invalid login, try again.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.session().is_none());
}

#[tokio::test]
async fn test_duplicate_sign_up_keeps_existing_session() {
    let harness = Harness::start(MemoryStore::new()).await;
    let mut client = harness.client().await;
    client.sign_up("a@b.com", "alice", "pw1").await.unwrap();

    let error = client.sign_up("c@d.com", "alice", "pw2").await.unwrap_err();

    assert!(matches!(error, ClientError::Api { .. }));
    assert_eq!(client.session().unwrap().profile.email.as_deref(), Some("a@b.com"));
}
