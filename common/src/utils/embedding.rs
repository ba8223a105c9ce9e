use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, ModelTrait, TextEmbedding, TextInitOptions};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::config::AppConfig;

/// Turns text into vectors. Implemented by every embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    #[default]
    FastEmbed,
    Hashed,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashed" => Ok(Self::Hashed),
            "fastembed" | "fast-embed" | "fast" => Ok(Self::FastEmbed),
            other => Err(anyhow!(
                "unknown embedding backend '{other}'. Expected 'openai', 'hashed', or 'fastembed'."
            )),
        }
    }
}

#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
    FastEmbed {
        model: Arc<Mutex<TextEmbedding>>,
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = match config.embedding_backend {
            EmbeddingBackend::FastEmbed => Self::new_fastembed(&config.embedding_model).await?,
            EmbeddingBackend::Hashed => Self::new_hashed(config.embedding_dimensions as usize),
            EmbeddingBackend::OpenAI => {
                let mut openai_config = async_openai::config::OpenAIConfig::new()
                    .with_api_base(&config.openai_base_url);
                if let Some(key) = &config.openai_api_key {
                    openai_config = openai_config.with_api_key(key);
                }
                Self::new_openai(
                    Arc::new(Client::with_config(openai_config)),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                )
            }
        };

        info!(
            backend = provider.backend_label(),
            dimension = provider.dimension(),
            "embedding provider initialised"
        );

        Ok(provider)
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Hashed { .. } => "hashed",
            EmbeddingInner::FastEmbed { .. } => "fastembed",
            EmbeddingInner::OpenAI { .. } => "openai",
        }
    }

    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: u32,
    ) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            },
        }
    }

    pub async fn new_fastembed(model_code: &str) -> Result<Self> {
        let model_name = resolve_fastembed_model(model_code)?;

        let options = TextInitOptions::new(model_name.clone()).with_show_download_progress(true);
        let model_name_code = model_name.to_string();

        let (model, dimension) = tokio::task::spawn_blocking(move || -> Result<_> {
            let info = EmbeddingModel::get_model_info(&model_name)
                .ok_or_else(|| anyhow!("FastEmbed model metadata missing for {model_name_code}"))?;
            let dimension = info.dim;
            let model =
                TextEmbedding::try_new(options).context("initialising FastEmbed text model")?;
            Ok((model, dimension))
        })
        .await
        .context("joining FastEmbed initialisation task")??;

        Ok(EmbeddingProvider {
            inner: EmbeddingInner::FastEmbed {
                model: Arc::new(Mutex::new(model)),
                dimension,
            },
        })
    }

    /// Deterministic bag-of-words vectors with no model download. Buckets come from
    /// SHA-256, so persisted vectors stay valid across toolchain upgrades.
    pub fn new_hashed(dimension: usize) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(hashed_embedding(text, *dimension)),
            EmbeddingInner::FastEmbed { model, .. } => {
                let input = vec![text.to_owned()];
                let embeddings = with_model_blocking(model, move |model| {
                    model
                        .embed(input, None)
                        .context("generating fastembed vector")
                })
                .await?;
                embeddings
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("fastembed returned no embedding for input"))
            }
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input([text])
                    .dimensions(*dimensions)
                    .build()?;

                let response = client.embeddings().create(request).await?;

                let embedding = response
                    .data
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("No embedding data received from OpenAI API"))?
                    .embedding;

                Ok(embedding)
            }
        }
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .into_iter()
                .map(|text| hashed_embedding(&text, *dimension))
                .collect()),
            EmbeddingInner::FastEmbed { model, .. } => {
                with_model_blocking(model, move |model| {
                    model
                        .embed(texts, None)
                        .context("generating fastembed batch embeddings")
                })
                .await
            }
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let expected = texts.len();
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input(texts)
                    .dimensions(*dimensions)
                    .build()?;

                let response = client.embeddings().create(request).await?;

                let mut data = response.data;
                data.sort_by_key(|item| item.index);
                let embeddings: Vec<Vec<f32>> =
                    data.into_iter().map(|item| item.embedding).collect();

                if embeddings.len() != expected {
                    return Err(anyhow!(
                        "OpenAI returned {} embeddings for {expected} inputs",
                        embeddings.len()
                    ));
                }

                Ok(embeddings)
            }
        }
    }

    fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } | EmbeddingInner::FastEmbed { dimension, .. } => {
                *dimension
            }
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions as usize,
        }
    }
}

/// Runs CPU-bound inference on the blocking pool so the async workers stay free.
async fn with_model_blocking<M, T, F>(model: &Arc<Mutex<M>>, work: F) -> Result<T>
where
    M: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut M) -> Result<T> + Send + 'static,
{
    let model = Arc::clone(model);
    tokio::task::spawn_blocking(move || {
        let mut guard = model
            .lock()
            .map_err(|_| anyhow!("embedding model lock poisoned"))?;
        work(&mut *guard)
    })
    .await
    .context("joining embedding inference task")?
}

/// Accepts both the upstream sentence-transformers id and the fastembed model codes.
fn resolve_fastembed_model(code: &str) -> Result<EmbeddingModel> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Ok(EmbeddingModel::default());
    }

    let short = trimmed
        .strip_prefix("sentence-transformers/")
        .unwrap_or(trimmed);
    if short.eq_ignore_ascii_case("all-MiniLM-L6-v2") {
        return Ok(EmbeddingModel::AllMiniLML6V2);
    }

    EmbeddingModel::from_str(trimmed).map_err(|err| anyhow!(err))
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];

    let mut saw_token = false;
    for token in tokens(text) {
        saw_token = true;
        if let Some(slot) = vector.get_mut(bucket(&token, dim)) {
            *slot += 1.0;
        }
    }

    if !saw_token {
        return vector;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str, dimension: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % dimension as u64) as usize
}
