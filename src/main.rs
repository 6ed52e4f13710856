use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use chat_relay::config::AppConfig;
use chat_relay::db::message_repository::MessageRepository;
use chat_relay::errors::AppError;
use chat_relay::relay::GroqClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Database (optional) ───────────────────────────────────────────────────
    let repo = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(AppError::DatabaseConnectionFailed)?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database connection established and migrations applied");
            Some(MessageRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; serving the completion relay only");
            None
        }
    };

    // ── Router ────────────────────────────────────────────────────────────────
    let provider = GroqClient::from_config(&config);
    info!("Relaying completions to {} with model {}", config.groq_api_url, provider.model());
    let app = chat_relay::app(provider, repo);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
