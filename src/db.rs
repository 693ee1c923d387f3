use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::shared::AppError;

/// Opens the connection pool for the rooms database
#[instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to connect to database");
            AppError::StoreUnavailable(e.to_string())
        })?;

    info!("Connected to database");
    Ok(pool)
}

/// Applies the embedded rooms and room_memberships migrations
#[instrument(skip(pool))]
pub async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
