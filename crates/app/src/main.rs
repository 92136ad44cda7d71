use std::sync::Arc;

use engine::GeoDistanceResolver;
use migration::{Migrator, MigratorTrait};
use settings::{Database, Distance, EngineSettings};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fleetledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;
    let engine = build_engine(db, &settings.engine, settings.distance).await?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

    Ok(())
}

async fn build_engine(
    db: sea_orm::DatabaseConnection,
    config: &EngineSettings,
    distance: Distance,
) -> Result<engine::Engine, Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!(
        cities = distance.cities.len(),
        timezone = %config.timezone,
        "building engine"
    );
    let resolver = GeoDistanceResolver::new(distance.cities, distance.circuity_factor);
    let engine = engine::Engine::builder()
        .database(db)
        .distance_resolver(Arc::new(resolver))
        .timezone(config.timezone)
        .distance_timeout(config.distance_timeout())
        .lock_wait(config.lock_wait())
        .max_pipeline_attempts(config.max_pipeline_attempts)
        .build()
        .await?;
    Ok(engine)
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
