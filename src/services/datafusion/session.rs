// DataFusion SessionManager
//
// Creates the SessionContext the default engine plans and runs statements on.

use anyhow::Result;
use datafusion::prelude::*;

/// Configuration for DataFusion sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution; 0 means one per CPU
    pub target_partitions: usize,
    /// Expose `information_schema` tables and `SHOW` statements
    pub information_schema: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            information_schema: true,
        }
    }
}

impl SessionConfig {
    fn effective_partitions(&self) -> usize {
        if self.target_partitions == 0 {
            num_cpus::get()
        } else {
            self.target_partitions
        }
    }
}

/// Manages DataFusion SessionContext lifecycle
///
/// # Example
/// ```rust,ignore
/// let manager = DataFusionSessionManager::new(SessionConfig::default());
/// let session = manager.create_session()?;
/// let df = session.sql("SELECT 1").await?;
/// ```
pub struct DataFusionSessionManager {
    config: SessionConfig,
}

impl DataFusionSessionManager {
    /// Create a new SessionManager with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Create a new DataFusion SessionContext
    ///
    /// Tables created through DDL live in the context's in-memory catalog, so
    /// the engine keeps one context for the lifetime of the process.
    pub fn create_session(&self) -> Result<SessionContext> {
        let config = datafusion::execution::config::SessionConfig::new()
            .with_batch_size(self.config.batch_size)
            .with_target_partitions(self.config.effective_partitions())
            .with_information_schema(self.config.information_schema);

        Ok(SessionContext::new_with_config(config))
    }

    /// Get the current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
