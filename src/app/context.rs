use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{CatchupError, Result};
use crate::config::Config;
use crate::digest::{DigestService, DigestSettings};
use crate::fetcher::HierarchicalFetcher;
use crate::llm::GenerationService;
use crate::source::{HttpItemSource, ItemSource};
use crate::store::SqliteStore;
use crate::visit::VisitTracker;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<HierarchicalFetcher>,
    pub visits: Arc<VisitTracker>,
    pub generator: Arc<GenerationService>,
    pub digest: DigestService,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        tracing::debug!("Opened database at {}", db_path.display());
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(SqliteStore::in_memory()?))
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let source: Arc<dyn ItemSource> = Arc::new(HttpItemSource::new(&config.api)?);
        let fetcher = Arc::new(HierarchicalFetcher::new(source));
        let visits = Arc::new(VisitTracker::new(store.clone()));
        let generator = Arc::new(GenerationService::new(&config.llm)?);

        let digest = DigestService::new(
            fetcher.clone(),
            visits.clone(),
            generator.clone(),
            config.llm.clone(),
            DigestSettings::from(&config.digest),
        );

        Ok(Self {
            config,
            store,
            fetcher,
            visits,
            generator,
            digest,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CatchupError::Other("Could not find data directory".into()))?;
        let app_dir = data_dir.join("hn-catchup");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("hn-catchup.db"))
    }
}
