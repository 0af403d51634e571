//! Dependency injection module using Shaku.
//!
//! `CoordinationModule` wires the SQLite pool, the three stores, and the lock
//! manager. Typed queues and task stores are generic over their payload, so
//! they are built on top of the resolved stores rather than registered as
//! components.

use crate::lock::{DistributedLock, LockManager, LockManagerParameters};
use crate::queue::MessageQueue;
use crate::tasks::TaskDescriptorStore;
use concord_config::{AppConfig, DatabaseConfig, LockConfig};
use concord_core::ConcordResult;
use concord_repository::{
    DatabasePool, DatabasePoolInterface, DatabasePoolParameters, LockStore, QueueStore,
    ScheduledTaskStore, SqliteLockStore, SqliteQueueStore, SqliteScheduledTaskStore,
};
use serde::{de::DeserializeOwned, Serialize};
use shaku::{module, HasComponent};
use std::sync::Arc;
use tracing::info;

module! {
    pub CoordinationModule {
        components = [
            DatabasePool,
            SqliteLockStore,
            SqliteQueueStore,
            SqliteScheduledTaskStore,
            LockManager,
        ],
        providers = [],
    }
}

/// Connects to the database, runs migrations, and builds the module.
pub async fn build_coordination_module(
    db_config: &DatabaseConfig,
    lock_config: &LockConfig,
) -> ConcordResult<Arc<CoordinationModule>> {
    let db_pool = DatabasePool::connect(db_config).await?;
    db_pool.run_migrations().await?;

    let module = CoordinationModule::builder()
        .with_component_parameters::<DatabasePool>(DatabasePoolParameters {
            pool: db_pool.inner().clone(),
        })
        .with_component_parameters::<LockManager>(LockManagerParameters {
            default_timeout: lock_config.default_timeout(),
        })
        .build();

    info!(
        default_lock_timeout = ?lock_config.default_timeout(),
        "Coordination module built"
    );
    Ok(Arc::new(module))
}

/// Builds the module from the full application configuration.
///
/// Metric descriptions are registered when metrics are enabled.
pub async fn build_from_config(config: &AppConfig) -> ConcordResult<Arc<CoordinationModule>> {
    if config.observability.metrics_enabled {
        crate::metrics::register_metrics();
    }
    build_coordination_module(&config.database, &config.locks).await
}

/// Resolves the lock manager.
#[must_use]
pub fn lock_manager(module: &CoordinationModule) -> Arc<dyn DistributedLock> {
    module.resolve()
}

/// Resolves the raw lock store.
#[must_use]
pub fn lock_store(module: &CoordinationModule) -> Arc<dyn LockStore> {
    module.resolve()
}

/// Builds a typed queue named `name` over the module's queue store.
#[must_use]
pub fn message_queue<T>(
    module: &CoordinationModule,
    name: impl Into<String>,
    config: &concord_config::QueueConfig,
) -> MessageQueue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let store: Arc<dyn QueueStore> = module.resolve();
    MessageQueue::new(store, name, config)
}

/// Builds a typed task descriptor store over the module's task store.
#[must_use]
pub fn task_store<TState>(module: &CoordinationModule) -> TaskDescriptorStore<TState> {
    let store: Arc<dyn ScheduledTaskStore> = module.resolve();
    TaskDescriptorStore::new(store)
}

/// Resolves the database pool, e.g. for health checks on shutdown.
#[must_use]
pub fn database_pool(module: &CoordinationModule) -> Arc<dyn DatabasePoolInterface> {
    module.resolve()
}
