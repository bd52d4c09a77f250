use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;

use parlor::configuration::get_configuration;
use parlor::database::{get_connection_pool, migrate_database};
use parlor::server::config::configure_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = get_configuration().context("Failed to load configuration")?;

    let pool = get_connection_pool(&settings)
        .await
        .context("Failed to open the database")?;
    migrate_database(&pool)
        .await
        .context("Failed to run database migrations")?;

    let app = configure_app(pool, &settings);

    let addr = SocketAddr::from((
        settings
            .application
            .host
            .parse::<std::net::IpAddr>()
            .context("Invalid application host")?,
        settings.application.port,
    ));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind address")?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
