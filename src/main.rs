use open_research_api::{
    AppState,
    config::{AppConfig, Env},
    create_router, store_from_config,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, builds the store gateway and serves
/// the HTTP API.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "open_research_api=debug,tower_http=info".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Record store gateway
    let store = store_from_config(&config);

    // 4. Router and server startup
    let address = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState { store, config });

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%address, %error, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {address}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "server exited with an error");
        std::process::exit(1);
    }
}
