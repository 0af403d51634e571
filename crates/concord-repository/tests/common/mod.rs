//! Common test infrastructure for database integration tests.

use concord_config::DatabaseConfig;
use concord_repository::{DatabasePool, DatabasePoolInterface};
use std::sync::Arc;
use tempfile::TempDir;

/// Throw-away SQLite database.
///
/// Lives in its own temporary directory, which is removed on drop together
/// with the WAL side files.
pub struct TestDatabase {
    _dir: TempDir,
    pool: Arc<DatabasePool>,
}

impl TestDatabase {
    /// Creates a fresh database file and runs migrations.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("concord-test.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            min_connections: 1,
            max_connections: 8,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            busy_timeout_ms: 10_000,
            log_queries: true,
        };

        let pool = DatabasePool::new(&config)
            .await
            .expect("Failed to open test database");

        pool.run_migrations()
            .await
            .expect("Failed to run migrations");

        Self {
            _dir: dir,
            pool: Arc::new(pool),
        }
    }

    /// Returns the database pool as an injectable interface.
    pub fn pool(&self) -> Arc<dyn DatabasePoolInterface> {
        Arc::clone(&self.pool) as Arc<dyn DatabasePoolInterface>
    }
}
