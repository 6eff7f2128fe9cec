use sqlx::postgres::PgPoolOptions;

use marketplace_api::api::{router, AppState};
use marketplace_api::config::AppConfig;
use marketplace_api::infrastructure::postgres_repositories;
use marketplace_api::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connected and migrated");

    let state = AppState {
        repositories: postgres_repositories(pool),
        settings: config.settings.clone(),
        jwt_secret: config.auth.jwt_secret.clone(),
        password_cost: config.auth.password_cost,
    };
    let app = router(state);

    // Start server
    let addr = config.server.socket_addr()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
