use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::embedding::EmbeddingBackend;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    Ollama,
    OpenAI,
}

fn default_generation_backend() -> GenerationBackend {
    GenerationBackend::Ollama
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    #[serde(default = "default_surrealdb_address")]
    pub surrealdb_address: String,
    #[serde(default)]
    pub surrealdb_username: Option<String>,
    #[serde(default)]
    pub surrealdb_password: Option<String>,
    #[serde(default = "default_surrealdb_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surrealdb_database")]
    pub surrealdb_database: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_retrieval_score_threshold")]
    pub retrieval_score_threshold: f32,
    #[serde(default = "default_max_upload_size_bytes")]
    pub max_upload_size_bytes: usize,
    #[serde(default = "default_ingest_max_files")]
    pub ingest_max_files: usize,
    #[serde(default = "default_generation_backend")]
    pub generation_backend: GenerationBackend,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_uploads_dir() -> String {
    "data/uploads".to_string()
}

fn default_surrealdb_address() -> String {
    "surrealkv://data/vector_store".to_string()
}

fn default_surrealdb_namespace() -> String {
    "rag_lab".to_string()
}

fn default_surrealdb_database() -> String {
    "rag_lab_documents".to_string()
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimensions() -> u32 {
    384
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    120
}

fn default_retrieval_top_k() -> usize {
    4
}

fn default_retrieval_score_threshold() -> f32 {
    0.2
}

fn default_max_upload_size_bytes() -> usize {
    10_000_000
}

fn default_ingest_max_files() -> usize {
    20
}

fn default_ollama_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_generation_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_http_port() -> u16 {
    8000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            uploads_dir: default_uploads_dir(),
            surrealdb_address: default_surrealdb_address(),
            surrealdb_username: None,
            surrealdb_password: None,
            surrealdb_namespace: default_surrealdb_namespace(),
            surrealdb_database: default_surrealdb_database(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            openai_api_key: None,
            openai_base_url: default_base_url(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            retrieval_top_k: default_retrieval_top_k(),
            retrieval_score_threshold: default_retrieval_score_threshold(),
            max_upload_size_bytes: default_max_upload_size_bytes(),
            ingest_max_files: default_ingest_max_files(),
            generation_backend: default_generation_backend(),
            ollama_url: default_ollama_url(),
            generation_model: default_generation_model(),
            generation_timeout_secs: default_generation_timeout_secs(),
            http_port: default_http_port(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
