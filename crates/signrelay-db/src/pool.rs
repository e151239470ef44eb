//! PostgreSQL connection pool wrapper.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::DbError;

/// Wrapper around the `SQLx` PostgreSQL pool with signrelay defaults.
#[derive(Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect to PostgreSQL with the default pool settings
    /// (10 connections, 5 second acquire timeout).
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConnectionFailed` if the database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;

        Ok(Self { inner })
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }

    /// Consume the wrapper, returning the underlying pool.
    #[must_use]
    pub fn into_inner(self) -> PgPool {
        self.inner
    }
}
