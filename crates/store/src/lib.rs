//! Document stores for ragroute.
//!
//! Every backend keeps owners in separate namespaces, ranks by exact cosine
//! similarity, and rejects vectors whose length disagrees with the owner's
//! existing vectors.

pub mod collection;
pub mod file_backend;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use collection::{OwnerCollection, generate_id, validate_owner};
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use vector::{cosine_similarity, rank_by_similarity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use ragroute_config::{StorageBackend, StorageConfig};
use ragroute_core::{DocumentStore, StoreError};
use std::sync::Arc;
use tracing::info;

/// Build the configured backend. `dimension` pins the vector length when known.
pub async fn build_store(
    config: &StorageConfig,
    dimension: Option<usize>,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StorageBackend::Memory => {
            let mut store = InMemoryStore::new();
            if let Some(d) = dimension {
                store = store.with_dimension(d);
            }
            Arc::new(store)
        }
        StorageBackend::File => {
            let mut store = FileStore::new(&config.data_dir);
            if let Some(d) = dimension {
                store = store.with_dimension(d);
            }
            Arc::new(store)
        }
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            if let Some(parent) = config.sqlite_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            let path = config.sqlite_path.to_string_lossy();
            let mut store = SqliteStore::new(&path).await?;
            if let Some(d) = dimension {
                store = store.with_dimension(d);
            }
            Arc::new(store)
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => {
            return Err(StoreError::Storage(
                "SQLite support not compiled in (enable the `sqlite` feature)".into(),
            ));
        }
    };

    info!(backend = store.name(), "Document store ready");
    Ok(store)
}
