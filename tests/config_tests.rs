use open_research_api::{
    AppConfig,
    config::{DEFAULT_USER_ROLE, Env},
    credential,
};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 8] = [
    "APP_ENV",
    "HDB_URL",
    "HDB_SCHEMA",
    "HDB_SERVICE_USERNAME",
    "HDB_SERVICE_PASSWORD",
    "HDB_USER_ROLE",
    "PORT",
    "CORS_ALLOWED_ORIGIN_PATTERN",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with every config variable cleared first, then puts the original
/// environment back whether or not the test panicked.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast_without_store_url() {
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("HDB_SERVICE_USERNAME", "svc");
                env::set_var("HDB_SERVICE_PASSWORD", "secret");
            }
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without HDB_URL"
    );
}

#[test]
#[serial]
fn test_app_config_production_fail_fast_without_service_account() {
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("HDB_URL", "https://store.example.com");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_app_config_production_with_everything_set() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("HDB_URL", "https://store.example.com");
            env::set_var("HDB_SCHEMA", "prod");
            env::set_var("HDB_SERVICE_USERNAME", "svc");
            env::set_var("HDB_SERVICE_PASSWORD", "secret");
            env::set_var("HDB_USER_ROLE", "role-42");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);

    let settings = config.store_settings().unwrap();
    assert_eq!(settings.url, "https://store.example.com");
    assert_eq!(settings.schema, "prod");
    assert_eq!(settings.user_role, "role-42");
    assert_eq!(settings.service_credential, credential::encode("svc", "secret"));
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.hdb_url, None);
    assert_eq!(config.hdb_schema, "dev");
    assert_eq!(config.hdb_service_username, "auth_bot");
    assert_eq!(config.hdb_user_role, DEFAULT_USER_ROLE);
    assert_eq!(config.port, 8080);
    assert_eq!(config.cors_origin_pattern, "localhost");
    // No URL locally means the in-memory store is used.
    assert!(config.store_settings().is_none());
}

#[test]
#[serial]
fn test_app_config_local_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("HDB_URL", "http://localhost:9925");
            env::set_var("PORT", "3001");
            env::set_var("CORS_ALLOWED_ORIGIN_PATTERN", "research.example");
        }
        AppConfig::load()
    });

    // APP_ENV unset falls back to local.
    assert_eq!(config.env, Env::Local);
    assert_eq!(config.port, 3001);
    assert_eq!(config.cors_origin_pattern, "research.example");
    assert_eq!(
        config.store_settings().unwrap().url,
        "http://localhost:9925"
    );
}

#[test]
#[serial]
fn test_app_config_rejects_invalid_port() {
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("PORT", "not-a-port");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}
