//! Durable storage for the signed-in user.
//!
//! A client holds at most one session. It is written to a JSON file on every change,
//! read back when the client starts, and removed on sign-out.

use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;
use ts_rs::TS;

use crate::models::Profile;

/// Session
///
/// What a client needs to act as a user: the name, the credential sent as
/// `hdb-token`, and the last known profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub username: String,
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage failed: {0}")]
    Io(#[from] io::Error),

    #[error("stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// SessionStore
///
/// File-backed storage for a single `Session`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the stored session; `None` when nothing has been saved.
    pub async fn load(&self) -> Result<Option<Session>, SessionError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec(session)?).await?;
        Ok(())
    }

    /// Removes the stored session. Clearing an empty store is not an error.
    pub async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}
