use std::sync::Arc;

use thiserror::Error;

use super::{KeyValueStore, StoreError};

pub const PRESETS_KEY: &str = "pestpro_job_description_presets";
pub const MAX_PRESETS: usize = 50;
pub const DEFAULT_PRESETS: [&str; 5] = [
    "General pest treatment",
    "Rodent inspection",
    "Bed bug treatment",
    "Termite inspection",
    "Follow-up service",
];

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset label is empty")]
    EmptyLabel,
    #[error("preset `{0}` already exists")]
    Duplicate(String),
    #[error("preset `{0}` does not exist")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Saved job-description presets, newest first. Past the cap the oldest
/// entries fall off.
#[derive(Clone)]
pub struct PresetStore {
    store: Arc<dyn KeyValueStore>,
}

impl PresetStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let stored = self.store.get(PRESETS_KEY).await?;
        let presets = stored
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .unwrap_or_else(|| DEFAULT_PRESETS.iter().map(|preset| preset.to_string()).collect());
        Ok(presets)
    }

    pub async fn add(&self, label: &str) -> Result<Vec<String>, PresetError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(PresetError::EmptyLabel);
        }

        let mut presets = self.list().await?;
        if presets.iter().any(|preset| preset == label) {
            return Err(PresetError::Duplicate(label.to_string()));
        }
        presets.insert(0, label.to_string());
        self.save(presets).await
    }

    pub async fn remove(&self, label: &str) -> Result<Vec<String>, PresetError> {
        let label = label.trim();
        let mut presets = self.list().await?;
        let before = presets.len();
        presets.retain(|preset| preset != label);
        if presets.len() == before {
            return Err(PresetError::NotFound(label.to_string()));
        }
        self.save(presets).await
    }

    async fn save(&self, mut presets: Vec<String>) -> Result<Vec<String>, PresetError> {
        presets.truncate(MAX_PRESETS);
        let encoded = serde_json::to_string(&presets)
            .map_err(|error| StoreError::Encode(error.to_string()))?;
        self.store.set(PRESETS_KEY, encoded).await?;
        Ok(presets)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{PresetError, PresetStore, DEFAULT_PRESETS, MAX_PRESETS, PRESETS_KEY};
    use crate::store::{InMemoryStore, KeyValueStore};

    fn presets() -> PresetStore {
        PresetStore::new(Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn empty_store_lists_starter_presets() {
        let listed = presets().list().await.expect("list");
        assert_eq!(listed, DEFAULT_PRESETS.map(str::to_string).to_vec());
    }

    #[tokio::test]
    async fn add_trims_and_puts_newest_first() {
        let store = presets();
        let updated = store.add("  Ant treatment ").await.expect("add");

        assert_eq!(updated.first().map(String::as_str), Some("Ant treatment"));
        assert_eq!(updated.len(), DEFAULT_PRESETS.len() + 1);
        assert_eq!(store.list().await.expect("list"), updated);
    }

    #[tokio::test]
    async fn duplicate_and_empty_labels_are_rejected() {
        let store = presets();

        assert!(matches!(store.add("Rodent inspection").await, Err(PresetError::Duplicate(_))));
        assert!(matches!(store.add("   ").await, Err(PresetError::EmptyLabel)));
    }

    #[tokio::test]
    async fn remove_unknown_label_is_an_error() {
        let store = presets();
        let updated = store.remove("Termite inspection").await.expect("remove");

        assert_eq!(updated.len(), DEFAULT_PRESETS.len() - 1);
        assert!(matches!(store.remove("Termite inspection").await, Err(PresetError::NotFound(_))));
    }

    #[tokio::test]
    async fn full_list_drops_oldest_entry_and_keeps_new_label() {
        let backing = Arc::new(InMemoryStore::default());
        let many: Vec<String> = (0..MAX_PRESETS).map(|index| format!("preset {index}")).collect();
        backing
            .set(PRESETS_KEY, serde_json::to_string(&many).expect("encode"))
            .await
            .expect("seed");
        let store = PresetStore::new(backing);

        let updated = store.add("one more").await.expect("add");

        assert_eq!(updated.len(), MAX_PRESETS);
        assert_eq!(updated[0], "one more");
        assert_eq!(updated[1], "preset 0");
        assert!(!updated.contains(&format!("preset {}", MAX_PRESETS - 1)));
        assert_eq!(store.list().await.expect("list"), updated);
    }

    #[tokio::test]
    async fn corrupt_entry_falls_back_to_starters() {
        let backing = Arc::new(InMemoryStore::default());
        backing.set(PRESETS_KEY, "oops".to_string()).await.expect("seed");

        let listed = PresetStore::new(backing).list().await.expect("list");

        assert_eq!(listed.len(), DEFAULT_PRESETS.len());
    }
}
