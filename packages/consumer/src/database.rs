use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// Connect with a fixed delay between attempts until it succeeds or
/// `cancel` fires.
pub async fn init_db_with_retry(
    config: &DatabaseConfig,
    delay: Duration,
    cancel: &CancellationToken,
) -> Option<DatabaseConnection> {
    loop {
        match init_db(config).await {
            Ok(db) => {
                info!("Connected to database");
                return Some(db);
            }
            Err(e) => warn!(error = %e, "Database unavailable, retrying"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
