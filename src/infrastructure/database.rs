//! Pooled SQLite connection

use crate::config::AppConfig;
use di::{Ref, inject, injectable};
use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use std::ops::Deref;

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> DatabaseConnection {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(config.database.clone());

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!().run(&self.connection).await
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}
