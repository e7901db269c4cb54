//! # corpus-qa
//!
//! Retrieval-augmented question answering over a local PDF corpus.
//!
//! Documents are split into overlapping, deterministically identified
//! chunks, embedded, and stored in a durable SQLite vector index. Questions
//! are answered by similarity search, bounded context assembly, one
//! language-model call, and a refusal gate that keeps the model from
//! fabricating answers when retrieval found nothing relevant.
//!
//! ## Architecture
//!
//! ```text
//! ingest:  pages ──▶ Chunker ──▶ ids ──▶ Embedder ──▶ SQLite index
//! ask:     question ──▶ Embedder ──▶ Retriever ──▶ Context ──▶ LLM ──▶ Gate
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping-window chunker and chunk identity |
//! | [`index`] | Durable vector index (SQLite) |
//! | [`extract`] | Page-text extraction collaborator |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Language-model collaborator |
//! | [`retrieve`] | Top-k retrieval with optional score floor |
//! | [`context`] | Bounded context assembly |
//! | [`gate`] | Refusal gating of generated answers |
//! | [`pipeline`] | `ingest` / `ask` orchestration |

pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod gate;
pub mod index;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod retrieve;
