use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::SeasonTable;
use crate::storage::{JsonlMatchSource, MatchCache, MatchSource, StorageConfig};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub seasons: Arc<SeasonTable>,
    pub cache: Arc<MatchCache>,
}

impl AppState {
    /// State backed by the JSONL files under the configured data directory.
    pub fn new(config: AppConfig) -> Self {
        let source = JsonlMatchSource::new(StorageConfig::new(config.data_dir.clone()));
        Self::with_source(config, Arc::new(source))
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn MatchSource>) -> Self {
        Self {
            seasons: Arc::new(config.season_table()),
            config: Arc::new(config),
            cache: Arc::new(MatchCache::new(source)),
        }
    }
}
