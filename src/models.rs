//! Core data models for the ingestion and query pipeline.

use chrono::{DateTime, Utc};

/// A logical unit of ingested content: one uploaded file, split into pages.
///
/// `document_id` is derived from the file name and is stable across
/// re-ingestion of the same file. Re-uploading under the same identity
/// supersedes the old content rather than merging with it.
#[derive(Debug, Clone)]
pub struct Document {
    pub document_id: String,
    /// Ordered page texts, one per source page.
    pub pages: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// A contiguous slice of one page's text, produced by the chunker.
///
/// Carries no identity or embedding yet; the orchestrator assigns the
/// deterministic chunk id and the embedding before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub source_page: usize,
    /// Running ordinal within the page, starting at 0.
    pub ordinal: usize,
    pub text: String,
    /// Trailing characters shared with the next chunk of the same page.
    /// Empty for the last chunk of a page.
    pub overlap_text: String,
}

/// Persisted form of a chunk: identity, provenance, text, and vector.
/// Owned exclusively by the vector index; immutable once written.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub source_page: i64,
    pub text: String,
    pub vector: Vec<f32>,
    /// SHA-256 of the chunk text, for staleness inspection.
    pub hash: String,
    pub metadata_json: String,
}

/// One element of a retrieval result, rank-ordered by descending score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    /// Cosine similarity against the query vector.
    pub score: f32,
}

/// Outcome of a vector-index upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    /// Records whose chunk id already existed and were left untouched.
    pub skipped: u64,
    /// Subset of `skipped` whose stored content hash differs from the
    /// incoming record: the source changed but the index kept the old text.
    pub stale: u64,
}

/// Summary returned by `ingest`.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub inserted: u64,
    pub skipped: u64,
    /// Skipped chunks whose content changed since they were indexed.
    /// Delete and re-ingest the document to refresh them.
    pub stale: u64,
}

/// Final answer returned by `ask`.
///
/// `grounded` is false when the answer gate emitted the canned refusal,
/// either because retrieval found nothing or because the raw model output
/// matched the refusal-phrase policy.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub grounded: bool,
    /// Chunk ids the context was assembled from, in rank order.
    pub sources: Vec<String>,
}

/// Corpus-level counts for the `status` command.
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub documents: i64,
    pub chunks: i64,
}
