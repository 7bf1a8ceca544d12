//! Database layer
//!
//! Connection management, migrations, entities, and the repository.

pub mod migrations;
pub mod models;
pub mod repository;

pub use migrations::run_migrations;
pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

/// Connect to the database and apply migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    run_migrations(&db).await?;
    Ok(db)
}
