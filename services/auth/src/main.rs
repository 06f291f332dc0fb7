use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use auth::{AppState, repositories::PgDirectory, routes};
use common::{Settings, database};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let pool = database::init_pool(&settings.database())?;

    match database::health_check(&pool).await {
        Ok(true) => info!("Database connection successful"),
        _ => warn!("Database not reachable yet; lookups will retry on demand"),
    }

    let directory = Arc::new(PgDirectory::new(pool));
    let app_state = AppState::new(&settings, directory)?;

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!("Authentication service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
