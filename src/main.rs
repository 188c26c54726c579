use payments_gateway::api::{create_router, AppState};
use payments_gateway::config::Settings;
use payments_gateway::idempotency::{IdempotencyCleanupJob, PgIdempotencyStore};
use payments_gateway::observability::{init_logging, LogConfig, LogFormat};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(settings.application.log_format.as_str()),
        ..LogConfig::default()
    });
    info!("Configuration loaded");

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    // Connect to Redis
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let mut con = redis_client.get_multiplexed_async_connection().await?;
    let _: () = redis::cmd("PING").query_async(&mut con).await?;
    info!("Redis connection established");

    // Background retention sweep for expired idempotency records
    let cleanup = IdempotencyCleanupJob::new(
        Arc::new(PgIdempotencyStore::new(pool.clone())),
        settings.idempotency.cleanup_interval_secs,
    );
    cleanup.start();

    let state = AppState::new(pool, redis_client, settings.idempotency.clone());
    let router = create_router(state);

    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
