//! Example server: settings from env (.env honored), model config from AUTOCRUD_CONFIG_PATH or the default
//! model over AUTOCRUD_SCHEMA, data routes under every AUTOCRUD_MOUNTS path.

use autocrud_sdk::{app_router, load_config, AppState, PgDataManager, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("autocrud_sdk=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    let config = load_config(&settings).await?;
    let manager = PgDataManager::new(pool, config);
    manager.warm_up().await?;
    let state = AppState::new(Arc::new(manager));

    let app = app_router(state, &settings.mounts, settings.body_limit);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(mounts = ?settings.mounts, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
