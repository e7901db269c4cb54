//! Query orchestration: `ingest` and `ask`.
//!
//! [`Pipeline`] composes the chunker, vector index, embedding provider,
//! language model, context assembler, and answer gate into the two public
//! operations of the core. All collaborators are injected and explicitly
//! owned, so test doubles and multiple isolated corpora can coexist in
//! one process.

use chrono::Utc;
use tracing::{info, warn};

use crate::chunk;
use crate::config::{ChunkingConfig, Config, ContextConfig, RetrievalConfig};
use crate::context;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::gate::{RefusalPolicy, Verdict};
use crate::index::VectorIndex;
use crate::llm::LanguageModel;
use crate::models::{Answer, ChunkRecord, Document, IndexStats, IngestReport};
use crate::retrieve;

pub struct Pipeline {
    index: Box<dyn VectorIndex>,
    embedder: Box<dyn EmbeddingProvider>,
    llm: Box<dyn LanguageModel>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
    context: ContextConfig,
    prompt_template: String,
    gate: RefusalPolicy,
}

impl Pipeline {
    pub fn new(
        index: Box<dyn VectorIndex>,
        embedder: Box<dyn EmbeddingProvider>,
        llm: Box<dyn LanguageModel>,
        config: &Config,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            chunking: config.chunking.clone(),
            retrieval: config.retrieval.clone(),
            context: config.context.clone(),
            prompt_template: config.llm.prompt_template.clone(),
            gate: RefusalPolicy::new(&config.gate),
        }
    }

    /// Ingest one document: split into chunks, assign deterministic ids,
    /// embed, and upsert. All-or-nothing: any failure before the upsert
    /// leaves the index untouched, and the upsert itself is transactional,
    /// so a document is never partially indexed.
    ///
    /// Re-ingesting byte-identical content reproduces the same chunk ids
    /// and inserts nothing new.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let chunks = chunk::split_pages(
            &document.pages,
            self.chunking.chunk_size,
            self.chunking.chunk_overlap,
        )?;

        if chunks.is_empty() {
            warn!(document_id = %document.document_id, "document produced no chunks");
            return Ok(IngestReport {
                document_id: document.document_id.clone(),
                chunk_count: 0,
                inserted: 0,
                skipped: 0,
                stale: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedded {} of {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let metadata_json = serde_json::json!({
            "uploaded_at": document.uploaded_at.to_rfc3339(),
        })
        .to_string();

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(c, vector)| ChunkRecord {
                chunk_id: chunk::chunk_id(&document.document_id, c.source_page, c.ordinal),
                document_id: document.document_id.clone(),
                source_page: c.source_page as i64,
                text: c.text.clone(),
                vector,
                hash: chunk::content_hash(&c.text),
                metadata_json: metadata_json.clone(),
            })
            .collect();

        let outcome = self.index.upsert(&records).await?;
        if outcome.stale > 0 {
            warn!(
                document_id = %document.document_id,
                stale = outcome.stale,
                "indexed content differs from the source; delete and re-ingest to refresh"
            );
        }
        info!(
            document_id = %document.document_id,
            chunks = records.len(),
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "ingested document"
        );

        Ok(IngestReport {
            document_id: document.document_id.clone(),
            chunk_count: records.len(),
            inserted: outcome.inserted,
            skipped: outcome.skipped,
            stale: outcome.stale,
        })
    }

    /// Extract page texts from a stored file and ingest them.
    pub async fn ingest_file(
        &self,
        extractor: &dyn TextExtractor,
        path: &std::path::Path,
    ) -> Result<IngestReport> {
        let document = Document {
            document_id: chunk::document_id_from_path(path),
            pages: extractor.extract(path)?,
            uploaded_at: Utc::now(),
        };
        self.ingest(&document).await
    }

    /// Answer a question against the indexed corpus.
    ///
    /// Empty retrieval short-circuits to the canned refusal without
    /// invoking the language model; otherwise the raw completion passes
    /// through the answer gate.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let question_vector = self.embedder.embed(question).await?;
        let results = retrieve::retrieve(
            self.index.as_ref(),
            &question_vector,
            self.retrieval.top_k,
            self.retrieval.score_threshold,
        )
        .await?;

        if results.is_empty() {
            info!("no relevant chunks; refusing without generation");
            return Ok(Answer {
                text: self.gate.refusal_message().to_string(),
                grounded: false,
                sources: Vec::new(),
            });
        }

        let context_text = context::assemble(&results, self.context.max_context_chars);
        let prompt = build_prompt(&self.prompt_template, &context_text, question);
        let raw_answer = self.llm.complete(&prompt).await?;

        let sources: Vec<String> = results.iter().map(|c| c.chunk_id.clone()).collect();
        match self.gate.classify(&raw_answer) {
            Verdict::Refused => Ok(Answer {
                text: self.gate.refusal_message().to_string(),
                grounded: false,
                sources,
            }),
            Verdict::Grounded => Ok(Answer {
                text: raw_answer,
                grounded: true,
                sources,
            }),
        }
    }

    /// Remove every chunk of a document. Unknown ids are a no-op.
    pub async fn delete_document(&self, document_id: &str) -> Result<u64> {
        self.index.delete_document(document_id).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.index.stats().await
    }
}

fn build_prompt(template: &str, context_text: &str, question: &str) -> String {
    template
        .replace("{context}", context_text)
        .replace("{question}", question)
}
