//! Common test infrastructure for coordination integration tests.

use concord_config::{DatabaseConfig, LockConfig, QueueConfig};
use concord_jobs::{di, CoordinationModule, DistributedLock, MessageQueue, TaskDescriptorStore};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tempfile::TempDir;

/// Coordination module over a throw-away SQLite database.
pub struct TestContext {
    _dir: TempDir,
    pub module: Arc<CoordinationModule>,
    pub queue_config: QueueConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("concord-jobs-test.db");

        let db_config = DatabaseConfig {
            max_connections: 16,
            busy_timeout_ms: 10_000,
            ..DatabaseConfig::with_url(format!("sqlite://{}", path.display()))
        };

        let module = di::build_coordination_module(&db_config, &LockConfig::default())
            .await
            .expect("Failed to build coordination module");

        Self {
            _dir: dir,
            module,
            queue_config: QueueConfig::default(),
        }
    }

    pub fn locks(&self) -> Arc<dyn DistributedLock> {
        di::lock_manager(&self.module)
    }

    pub fn queue<T>(&self, name: &str) -> MessageQueue<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        di::message_queue(&self.module, name, &self.queue_config)
    }

    pub fn tasks<TState>(&self) -> TaskDescriptorStore<TState> {
        di::task_store(&self.module)
    }
}
