// Session Properties
//
// Process-wide key/value store written by the SET / RESET / ADD handlers and
// read by the translator (e.g. `pipeline.name` for job graph naming).

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const PIPELINE_NAME: &str = "pipeline.name";
pub const PIPELINE_JARS: &str = "pipeline.jars";
pub const PIPELINE_FILES: &str = "pipeline.files";

#[derive(Debug, Clone, Default)]
pub struct SessionProperties {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl SessionProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with initial values (from configuration)
    pub fn with_defaults(defaults: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(defaults)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        tracing::debug!("Session property {} = {}", key, value);
        self.inner.write().await.insert(key, value);
    }

    /// Append to a `;`-separated list property
    pub async fn append(&self, key: &str, value: &str) {
        let mut guard = self.inner.write().await;
        let entry = guard.entry(key.to_string()).or_default();
        if !entry.is_empty() {
            entry.push(';');
        }
        entry.push_str(value);
    }

    pub async fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let props = SessionProperties::new();
        props.set(PIPELINE_NAME, "job").await;
        assert_eq!(props.get(PIPELINE_NAME).await.as_deref(), Some("job"));

        assert_eq!(props.remove(PIPELINE_NAME).await.as_deref(), Some("job"));
        assert!(props.get(PIPELINE_NAME).await.is_none());
    }

    #[tokio::test]
    async fn test_append_list() {
        let props = SessionProperties::new();
        props.append(PIPELINE_JARS, "/a.jar").await;
        props.append(PIPELINE_JARS, "/b.jar").await;
        assert_eq!(
            props.get(PIPELINE_JARS).await.as_deref(),
            Some("/a.jar;/b.jar")
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let props = SessionProperties::new();
        let other = props.clone();
        other.set("k", "v").await;
        assert_eq!(props.snapshot().await.len(), 1);
        props.clear().await;
        assert!(other.snapshot().await.is_empty());
    }
}
