use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub gate: GateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Optional similarity floor. Candidates scoring below it are dropped
    /// even inside the top-k; an empty result is a valid outcome.
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: None,
        }
    }
}

fn default_top_k() -> i64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_max_context_chars() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"ollama"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the ollama provider.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: None,
            base_url: default_ollama_url(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Must contain `{context}` and `{question}` placeholders.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            prompt_template: default_prompt_template(),
        }
    }
}

fn default_llm_model() -> String {
    "mistral".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_prompt_template() -> String {
    "你是一个专业的文档问答助手。请仔细阅读以下文档内容，并且只基于文档内容回答问题。\
     如果文档中没有相关信息，请明确说明。\n\n{context}\n\n---\n\n请基于以上内容回答问题：{question}"
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    /// Case-insensitive substrings that mark a model answer as a refusal.
    #[serde(default = "default_refusal_phrases")]
    pub refusal_phrases: Vec<String>,
    /// Canned message emitted instead of the raw answer on refusal.
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            refusal_phrases: default_refusal_phrases(),
            refusal_message: default_refusal_message(),
        }
    }
}

fn default_refusal_phrases() -> Vec<String> {
    [
        "抱歉",
        "找不到相关信息",
        "没有相关信息",
        "没有提到",
        "无法确定",
        "not found",
        "cannot determine",
        "no relevant information",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_refusal_message() -> String {
    "抱歉，知识库中没有找到相关信息。".to_string()
}

impl Config {
    /// Minimal config for tests and library embedding: temp-ish db path,
    /// all other sections defaulted.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/cqa.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.context.max_context_chars == 0 {
        anyhow::bail!("context.max_context_chars must be > 0");
    }
    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    match config.embedding.provider.as_str() {
        "ollama" => {}
        "openai" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 for the openai provider");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if !config.llm.prompt_template.contains("{context}")
        || !config.llm.prompt_template.contains("{question}")
    {
        anyhow::bail!("llm.prompt_template must contain {{context}} and {{question}}");
    }
    if config.gate.refusal_message.is_empty() {
        anyhow::bail!("gate.refusal_message must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_is_valid() {
        let config = Config::minimal();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::minimal();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.retrieval.score_threshold.is_none());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::minimal();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn openai_provider_requires_dims() {
        let mut config = Config::minimal();
        config.embedding.provider = "openai".to_string();
        config.embedding.dims = None;
        assert!(validate(&config).is_err());

        config.embedding.dims = Some(1536);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = Config::minimal();
        config.embedding.provider = "chroma".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn prompt_template_placeholders_required() {
        let mut config = Config::minimal();
        config.llm.prompt_template = "no placeholders here".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn parses_full_toml() {
        let toml_src = r#"
[db]
path = "/tmp/cqa.sqlite"

[chunking]
chunk_size = 500
chunk_overlap = 100

[retrieval]
top_k = 5
score_threshold = 0.25

[embedding]
provider = "openai"
model = "text-embedding-3-small"
dims = 1536

[gate]
refusal_phrases = ["not found"]
refusal_message = "Nothing relevant in the corpus."
"#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.retrieval.score_threshold, Some(0.25));
        assert_eq!(config.gate.refusal_phrases, vec!["not found".to_string()]);
        // Unset sections fall back to defaults.
        assert_eq!(config.context.max_context_chars, 4000);
        assert_eq!(config.llm.model, "mistral");
    }
}
