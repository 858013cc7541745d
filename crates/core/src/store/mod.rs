//! Injected key-value storage for client-side state (cached user, presets).

pub mod file;
pub mod memory;
pub mod presets;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use presets::{PresetError, PresetStore};
pub use session::SessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure at `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("store contents are not a JSON object: {0}")]
    Corrupt(String),
    #[error("value could not be encoded: {0}")]
    Encode(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
