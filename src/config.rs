use std::env;

use crate::{credential, store::StoreSettings};

/// Role id given to every account created through sign-up.
pub const DEFAULT_USER_ROLE: &str = "2cd31f45-a802-403e-a25f-9bf9f63e17e9";

/// AppConfig
///
/// Holds the application's entire configuration state, immutable once loaded.
/// It is pulled into handlers via `FromRef` as part of the shared `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the in-memory store fallback.
    pub env: Env,
    // Record store operations endpoint. `None` only in local mode, where the in-memory store is used.
    pub hdb_url: Option<String>,
    // Schema holding the `researchers` and `posts` tables.
    pub hdb_schema: String,
    // Service account used for `add_user`.
    pub hdb_service_username: String,
    pub hdb_service_password: String,
    // Role id assigned to new accounts.
    pub hdb_user_role: String,
    pub port: u16,
    // Substring a request's Origin must contain to pass CORS.
    pub cors_origin_pattern: String,
}

/// Env
///
/// Defines the runtime context: local development or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            hdb_url: None,
            hdb_schema: "dev".to_string(),
            hdb_service_username: "auth_bot".to_string(),
            hdb_service_password: "auth_bot".to_string(),
            hdb_user_role: DEFAULT_USER_ROLE.to_string(),
            port: 8080,
            cors_origin_pattern: "localhost".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables (after `.env` has been loaded).
    ///
    /// # Panics
    /// Panics in production when `HDB_URL` or the service account is not set, and in any
    /// environment when `PORT` is not a valid port number. The server must not start
    /// half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .map(|raw| raw.parse().expect("FATAL: PORT must be a valid port number"))
            .unwrap_or(8080);

        let defaults = Self::default();
        let optional = |key: &str, fallback: &str| env::var(key).unwrap_or_else(|_| fallback.to_string());

        let shared = Self {
            hdb_schema: optional("HDB_SCHEMA", &defaults.hdb_schema),
            hdb_user_role: optional("HDB_USER_ROLE", DEFAULT_USER_ROLE),
            cors_origin_pattern: optional("CORS_ALLOWED_ORIGIN_PATTERN", &defaults.cors_origin_pattern),
            port,
            ..defaults
        };

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Unset locally means "run against the in-memory store".
                hdb_url: env::var("HDB_URL").ok(),
                hdb_service_username: optional("HDB_SERVICE_USERNAME", &shared.hdb_service_username),
                hdb_service_password: optional("HDB_SERVICE_PASSWORD", &shared.hdb_service_password),
                ..shared
            },
            Env::Production => Self {
                env: Env::Production,
                hdb_url: Some(env::var("HDB_URL").expect("FATAL: HDB_URL required in prod")),
                hdb_service_username: env::var("HDB_SERVICE_USERNAME")
                    .expect("FATAL: HDB_SERVICE_USERNAME required in prod"),
                hdb_service_password: env::var("HDB_SERVICE_PASSWORD")
                    .expect("FATAL: HDB_SERVICE_PASSWORD required in prod"),
                ..shared
            },
        }
    }

    /// Gateway settings, or `None` when no store URL is configured.
    pub fn store_settings(&self) -> Option<StoreSettings> {
        let url = self.hdb_url.clone()?;
        Some(StoreSettings {
            url,
            schema: self.hdb_schema.clone(),
            service_credential: credential::encode(
                &self.hdb_service_username,
                &self.hdb_service_password,
            ),
            user_role: self.hdb_user_role.clone(),
        })
    }
}
