//! Durable vector index backed by SQLite.
//!
//! The index owns the mapping `chunk_id -> (vector, text, metadata)` and the
//! similarity search over it. Vectors are stored as little-endian f32 BLOBs
//! and similarity is computed in Rust, which is plenty for a single local
//! corpus.
//!
//! The [`VectorIndex`] trait is the seam the orchestrator is built against;
//! [`SqliteIndex`] is the durable implementation, and tests may substitute
//! their own. Writes are serialized by SQLite itself; `search` runs against
//! a consistent snapshot, so a concurrent `delete` is observed either fully
//! applied or not at all.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ChunkRecord, IndexStats, ScoredChunk, UpsertOutcome};

/// Storage abstraction for the chunk corpus.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert records whose chunk id is not yet present; existing ids are
    /// left untouched and counted as skipped. Skipped records whose stored
    /// content hash no longer matches the incoming one are additionally
    /// counted as stale. All-or-nothing: either every new record in the
    /// batch is durably persisted before this returns, or none are.
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<UpsertOutcome>;

    /// k-nearest-neighbor search by cosine similarity, descending. Ties are
    /// broken by insertion order, so repeated calls over an unchanged index
    /// return the same ordering. `k <= 0` is an [`Error::InvalidArgument`].
    async fn search(&self, query_vector: &[f32], k: i64) -> Result<Vec<ScoredChunk>>;

    /// Remove every chunk belonging to `document_id`. Unknown ids are a
    /// no-op, not an error. Returns the number of chunks removed.
    async fn delete_document(&self, document_id: &str) -> Result<u64>;

    /// Corpus-level counts.
    async fn stats(&self) -> Result<IndexStats>;
}

/// SQLite-backed [`VectorIndex`].
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to (or create) the database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = crate::db::connect(path).await?;
        crate::migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Chunk counts per document, for the status report.
    pub async fn document_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT document_id, COUNT(*) AS n FROM chunks GROUP BY document_id ORDER BY document_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("document_id"), row.get("n")))
            .collect())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, records: &[ChunkRecord]) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;
        let now = chrono::Utc::now().timestamp();

        let mut outcome = UpsertOutcome::default();
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO chunks
                    (chunk_id, document_id, source_page, text, embedding, hash, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.chunk_id)
            .bind(&record.document_id)
            .bind(record.source_page)
            .bind(&record.text)
            .bind(vec_to_blob(&record.vector))
            .bind(&record.hash)
            .bind(&record.metadata_json)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
                let stored_hash: String =
                    sqlx::query_scalar("SELECT hash FROM chunks WHERE chunk_id = ?")
                        .bind(&record.chunk_id)
                        .fetch_one(&mut *tx)
                        .await?;
                if stored_hash != record.hash {
                    outcome.stale += 1;
                }
            }
        }

        tx.commit().await?;
        debug!(
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            stale = outcome.stale,
            "upserted chunk batch"
        );
        Ok(outcome)
    }

    async fn search(&self, query_vector: &[f32], k: i64) -> Result<Vec<ScoredChunk>> {
        if k <= 0 {
            return Err(Error::InvalidArgument(format!("k must be > 0, got {k}")));
        }

        // Fetch in insertion (rowid) order; the stable sort below then keeps
        // that order for score ties, which makes ranking deterministic.
        let rows = sqlx::query(
            "SELECT chunk_id, document_id, text, embedding FROM chunks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ScoredChunk {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vector, &vector),
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k as usize);

        Ok(candidates)
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        debug!(
            document_id,
            removed = result.rows_affected(),
            "deleted document chunks"
        );
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT document_id) AS documents, COUNT(*) AS chunks FROM chunks",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(IndexStats {
            documents: row.get("documents"),
            chunks: row.get("chunks"),
        })
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
