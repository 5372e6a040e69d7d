pub mod assistant;
pub mod client;
pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;
pub mod ui;

use std::sync::Arc;

use config::AppConfig;
use storage::Storage;
use tasks::TaskService;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub tasks: Arc<TaskService>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(
            Storage::new_with_slow_query(
                &config.data_dir,
                config.observability.slow_query_threshold_ms,
            )
            .await?,
        );
        let tasks = Arc::new(TaskService::new(storage.pool()));
        Ok(Self {
            config: Arc::new(config),
            storage,
            tasks,
            started_at: std::time::Instant::now(),
        })
    }
}
