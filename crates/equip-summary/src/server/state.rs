//! Application state for the summary server

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::error::Result;
use crate::ingestion::SummarySchema;
use crate::storage::HistoryStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Bounded upload history
    store: HistoryStore,
    /// Token issuance and verification
    tokens: TokenService,
    /// Column requirements for uploads
    schema: SummarySchema,
}

impl AppState {
    /// Create state backed by the on-disk store named in the config
    pub fn new(config: AppConfig) -> Result<Self> {
        tracing::info!(
            "Opening history store at {} (capacity {})",
            config.storage.database_path.display(),
            config.storage.history_capacity
        );
        let store = HistoryStore::open(
            &config.storage.database_path,
            config.storage.history_capacity,
            Duration::from_millis(config.storage.busy_timeout_ms),
        )?;
        Ok(Self::with_store(config, store))
    }

    /// Create state around an existing store
    pub fn with_store(config: AppConfig, store: HistoryStore) -> Self {
        let tokens = TokenService::from_config(&config.auth);
        if tokens.user_count() == 0 {
            tracing::warn!("No users configured; every authenticated endpoint will reject requests");
        }
        let schema = SummarySchema::from_config(&config.schema);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                schema,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.inner.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    pub fn schema(&self) -> &SummarySchema {
        &self.inner.schema
    }

    /// Number of records returned by history and report queries
    pub fn history_limit(&self) -> usize {
        self.inner.store.capacity()
    }
}
