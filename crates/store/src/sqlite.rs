//! SQLite document store.
//!
//! All owners share one `documents` table keyed by `(owner, id)`. Vectors are
//! stored as little-endian f32 blobs and ranked in process, so search results
//! match the other backends exactly.

use crate::collection::{check_dimension, generate_id, validate_owner};
use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use ragroute_core::{Document, DocumentSource, DocumentStore, SearchResult, StoreError, StoreStats};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
    path: String,
    dimension: Option<usize>,
    /// Serializes writers so id and dimension checks see committed state.
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to ":memory:" is its own database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            path: path.to_string(),
            dimension: None,
            write_lock: Mutex::new(()),
        };
        store.run_migrations().await?;
        info!(path, "SQLite document store initialized");
        Ok(store)
    }

    /// Reject embeddings whose length differs from `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner       TEXT NOT NULL,
                id          TEXT NOT NULL,
                content     TEXT NOT NULL,
                source      TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL,
                embedding   BLOB,
                UNIQUE(owner, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner, seq)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("owner index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_document(row: &SqliteRow) -> Result<Document, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let owner: String = row.try_get("owner").map_err(|e| column("owner", e))?;
        let content: String = row.try_get("content").map_err(|e| column("content", e))?;
        let source: String = row.try_get("source").map_err(|e| column("source", e))?;
        let metadata_json: String = row.try_get("metadata").map_err(|e| column("metadata", e))?;
        let created_at: String = row.try_get("created_at").map_err(|e| column("created_at", e))?;
        let blob: Option<Vec<u8>> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        let source = DocumentSource::from_str(&source).map_err(|reason| StoreError::Corrupt {
            owner: owner.clone(),
            reason,
        })?;
        let metadata: HashMap<String, serde_json::Value> =
            serde_json::from_str(&metadata_json).map_err(|e| StoreError::Corrupt {
                owner: owner.clone(),
                reason: format!("metadata for {id}: {e}"),
            })?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt {
                owner: owner.clone(),
                reason: format!("created_at for {id}: {e}"),
            })?;

        Ok(Document {
            id,
            content,
            owner,
            source,
            metadata,
            created_at,
            embedding: blob.as_deref().map(blob_to_embedding),
        })
    }
}

async fn id_exists(conn: &mut SqliteConnection, owner: &str, id: &str) -> Result<bool, StoreError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE owner = ?1 AND id = ?2")
        .bind(owner)
        .bind(id)
        .fetch_one(conn)
        .await
        .map(|n| n > 0)
        .map_err(|e| StoreError::QueryFailed(format!("Id lookup: {e}")))
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self, owner: &str) -> Result<(), StoreError> {
        validate_owner(owner)
    }

    async fn add(&self, mut document: Document) -> Result<String, StoreError> {
        validate_owner(&document.owner)?;
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        if let Some(embedding) = &document.embedding {
            let expected = match self.dimension {
                Some(d) => Some(d),
                None => {
                    let bytes: Option<i64> = sqlx::query_scalar(
                        "SELECT length(embedding) FROM documents WHERE owner = ?1 AND embedding IS NOT NULL LIMIT 1",
                    )
                    .bind(&document.owner)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| StoreError::QueryFailed(format!("Dimension lookup: {e}")))?;
                    bytes.map(|b| b as usize / 4)
                }
            };
            check_dimension(embedding, expected)?;
        }

        if document.id.is_empty() {
            let mut attempt = 0;
            loop {
                let candidate = generate_id(&document.content, document.created_at, attempt);
                if !id_exists(&mut *tx, &document.owner, &candidate).await? {
                    document.id = candidate;
                    break;
                }
                attempt += 1;
            }
        } else if id_exists(&mut *tx, &document.owner, &document.id).await? {
            return Err(StoreError::DuplicateId(document.id));
        }

        let metadata = serde_json::to_string(&document.metadata)
            .map_err(|e| StoreError::Storage(format!("Metadata serialization: {e}")))?;
        let blob = document.embedding.as_deref().map(embedding_to_blob);

        sqlx::query(
            r#"
            INSERT INTO documents (owner, id, content, source, metadata, created_at, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&document.owner)
        .bind(&document.id)
        .bind(&document.content)
        .bind(document.source.as_str())
        .bind(&metadata)
        .bind(document.created_at.to_rfc3339())
        .bind(blob.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(owner = %document.owner, id = %document.id, "Stored document");
        Ok(document.id)
    }

    async fn search(&self, query: &[f32], owner: &str, top_k: usize, min_score: f32) -> Result<Vec<SearchResult>, StoreError> {
        validate_owner(owner)?;
        let rows = sqlx::query("SELECT * FROM documents WHERE owner = ?1 AND embedding IS NOT NULL ORDER BY seq")
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Vector scan: {e}")))?;

        let documents = rows
            .iter()
            .map(Self::row_to_document)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(first) = documents.first().and_then(|d| d.embedding.as_ref()) {
            check_dimension(query, Some(first.len()))?;
        }

        Ok(vector::rank_by_similarity(&documents, query, top_k, min_score))
    }

    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        validate_owner(owner)?;
        let rows = sqlx::query("SELECT * FROM documents WHERE owner = ?1 ORDER BY seq LIMIT ?2")
            .bind(owner)
            .bind(limit.min(i64::MAX as usize) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("List: {e}")))?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn get(&self, id: &str, owner: &str) -> Result<Option<Document>, StoreError> {
        validate_owner(owner)?;
        let row = sqlx::query("SELECT * FROM documents WHERE owner = ?1 AND id = ?2")
            .bind(owner)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Get: {e}")))?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<bool, StoreError> {
        validate_owner(owner)?;
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM documents WHERE owner = ?1 AND id = ?2")
            .bind(owner)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, owner: &str) -> Result<usize, StoreError> {
        validate_owner(owner)?;
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM documents WHERE owner = ?1")
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Clear failed: {e}")))?;
        Ok(result.rows_affected() as usize)
    }

    async fn stats(&self, owner: &str) -> Result<StoreStats, StoreError> {
        validate_owner(owner)?;
        let rows = sqlx::query(
            r#"
            SELECT source, COUNT(*) AS n, COUNT(embedding) AS with_vectors
            FROM documents WHERE owner = ?1 GROUP BY source
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Stats: {e}")))?;

        let mut stats = StoreStats {
            storage_path: Some(self.path.clone()),
            ..Default::default()
        };
        for row in &rows {
            let source: String = row
                .try_get("source")
                .map_err(|e| StoreError::QueryFailed(format!("source column: {e}")))?;
            let n: i64 = row
                .try_get("n")
                .map_err(|e| StoreError::QueryFailed(format!("count column: {e}")))?;
            let with_vectors: i64 = row
                .try_get("with_vectors")
                .map_err(|e| StoreError::QueryFailed(format!("count column: {e}")))?;

            let source = DocumentSource::from_str(&source).map_err(|reason| StoreError::Corrupt {
                owner: owner.to_string(),
                reason,
            })?;
            stats.total += n as usize;
            stats.embedding_count += with_vectors as usize;
            stats.by_source.insert(source, n as usize);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    fn doc(owner: &str, content: &str, embedding: Vec<f32>) -> Document {
        Document::new(content, owner, DocumentSource::Manual).with_embedding(embedding)
    }

    #[test]
    fn blob_round_trip() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(blob_to_embedding(&embedding_to_blob(&v)), v);
    }

    #[tokio::test]
    async fn add_get_and_search() {
        let store = store().await;
        let near = store
            .add(doc("u1", "near", vec![1.0, 0.0, 0.0]).with_metadata("chunk", 2))
            .await
            .unwrap();
        store.add(doc("u1", "far", vec![0.0, 0.0, 1.0])).await.unwrap();

        let fetched = store.get(&near, "u1").await.unwrap().unwrap();
        assert_eq!(fetched.content, "near");
        assert_eq!(fetched.metadata["chunk"], 2);

        let results = store.search(&[0.9, 0.1, 0.0], "u1", 1, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, near);
    }

    #[tokio::test]
    async fn owners_isolated() {
        let store = store().await;
        let id = store.add(doc("alice", "private", vec![1.0])).await.unwrap();
        assert!(store.get(&id, "bob").await.unwrap().is_none());
        assert!(store.search(&[1.0], "bob", 5, 0.0).await.unwrap().is_empty());
        assert!(!store.delete(&id, "bob").await.unwrap());
    }

    #[tokio::test]
    async fn dimension_fixed_by_first_vector() {
        let store = store().await;
        store.add(doc("u1", "a", vec![1.0, 0.0])).await.unwrap();
        let err = store.add(doc("u1", "b", vec![1.0, 0.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, actual: 3 }));
        // Another owner starts fresh
        store.add(doc("u2", "c", vec![1.0, 0.0, 0.0])).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_explicit_id_rejected() {
        let store = store().await;
        let mut a = doc("u1", "a", vec![1.0]);
        a.id = "same".into();
        let mut b = doc("u1", "b", vec![1.0]);
        b.id = "same".into();
        store.add(a).await.unwrap();
        assert!(matches!(store.add(b).await, Err(StoreError::DuplicateId(_))));
    }

    #[tokio::test]
    async fn list_clear_and_stats() {
        let store = store().await;
        store.add(doc("u1", "one", vec![1.0])).await.unwrap();
        store
            .add(Document::new("two", "u1", DocumentSource::Web))
            .await
            .unwrap();

        let listed: Vec<_> = store.list("u1", 10).await.unwrap().into_iter().map(|d| d.content).collect();
        assert_eq!(listed, ["one", "two"]);

        let stats = store.stats("u1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.embedding_count, 1);
        assert_eq!(stats.by_source[&DocumentSource::Web], 1);

        assert_eq!(store.clear("u1").await.unwrap(), 2);
        assert_eq!(store.clear("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.sqlite");
        let path = path.to_str().unwrap();

        let id = {
            let store = SqliteStore::new(path).await.unwrap();
            store.add(doc("u1", "durable", vec![0.0, 1.0])).await.unwrap()
        };

        let reopened = SqliteStore::new(path).await.unwrap();
        let fetched = reopened.get(&id, "u1").await.unwrap().unwrap();
        assert_eq!(fetched.embedding.unwrap(), vec![0.0, 1.0]);
    }
}
