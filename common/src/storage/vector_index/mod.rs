pub mod memory;
pub mod surreal;

use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::AppError, utils::embedding::Embedder};

/// One stored chunk together with its embedding and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub doc_id: String,
    pub file_name: String,
    pub stored_path: String,
    pub chunk_index: usize,
    pub chunk_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Query-time projection of a stored chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub doc_id: String,
    pub file_name: String,
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
}

/// Identity of the document whose chunks are being indexed.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSource<'a> {
    pub doc_id: &'a str,
    pub file_name: &'a str,
    pub stored_path: &'a str,
}

pub fn chunk_id(doc_id: &str, index: usize) -> String {
    format!("{doc_id}:{index}")
}

/// Storage behind the index. Implementations must swap a document's chunk set
/// atomically so concurrent queries never see it half replaced.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    fn label(&self) -> &'static str;

    /// Replaces every entry of `doc_id` with `entries`.
    async fn replace_document(
        &self,
        doc_id: &str,
        entries: Vec<IndexedChunk>,
    ) -> Result<(), AppError>;

    async fn delete_document(&self, doc_id: &str) -> Result<(), AppError>;

    /// Up to `limit` entries ordered by raw cosine similarity, best first.
    async fn query(&self, embedding: &[f32], limit: usize)
        -> Result<Vec<RetrievedChunk>, AppError>;

    async fn chunks_for_document(&self, doc_id: &str) -> Result<Vec<IndexedChunk>, AppError>;

    async fn health(&self) -> Result<(), AppError>;
}

/// Embeds and stores chunks, and answers similarity queries with scores in `[0, 1]`.
///
/// Any failure of the embedder or the backend is reported as
/// [`AppError::IndexUnavailable`], never as an empty result.
#[derive(Clone)]
pub struct VectorIndex {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    pub fn new(backend: Arc<dyn VectorBackend>, embedder: Arc<dyn Embedder>) -> Self {
        Self { backend, embedder }
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend.label()
    }

    /// Replaces all chunks of `source.doc_id` and returns how many were stored.
    ///
    /// Embeddings are computed before the backend is touched, so a failing
    /// embedder leaves the previous chunk set in place.
    #[tracing::instrument(skip_all, fields(doc_id = %source.doc_id, chunks = chunks.len()))]
    pub async fn upsert(
        &self,
        source: ChunkSource<'_>,
        chunks: &[String],
    ) -> Result<usize, AppError> {
        if chunks.is_empty() {
            self.delete(source.doc_id).await?;
            return Ok(0);
        }

        let embeddings = self
            .embedder
            .embed_batch(chunks.to_vec())
            .await
            .map_err(|err| unavailable(AppError::Anyhow(err)))?;

        if embeddings.len() != chunks.len() {
            return Err(unavailable(AppError::InternalError(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            ))));
        }

        let entries: Vec<IndexedChunk> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| IndexedChunk {
                doc_id: source.doc_id.to_owned(),
                file_name: source.file_name.to_owned(),
                stored_path: source.stored_path.to_owned(),
                chunk_index: index,
                chunk_id: chunk_id(source.doc_id, index),
                text: text.clone(),
                embedding,
            })
            .collect();
        let count = entries.len();

        self.backend
            .replace_document(source.doc_id, entries)
            .await
            .map_err(unavailable)?;

        debug!(doc_id = %source.doc_id, count, "document chunks replaced");
        Ok(count)
    }

    /// Removes every chunk of `doc_id`. Deleting an unknown document is a no-op.
    pub async fn delete(&self, doc_id: &str) -> Result<(), AppError> {
        self.backend
            .delete_document(doc_id)
            .await
            .map_err(unavailable)
    }

    /// Best `top_k` candidates by relevance, minus those scoring below `score_threshold`.
    #[tracing::instrument(skip_all, fields(top_k, score_threshold))]
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|err| unavailable(AppError::Anyhow(err)))?;

        let mut candidates = self
            .backend
            .query(&embedding, top_k)
            .await
            .map_err(unavailable)?;

        for candidate in &mut candidates {
            candidate.score = relevance(candidate.score);
        }
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        candidates.truncate(top_k);

        let candidate_count = candidates.len();
        candidates.retain(|candidate| candidate.score >= score_threshold);

        debug!(
            candidates = candidate_count,
            returned = candidates.len(),
            "vector search finished"
        );

        Ok(candidates)
    }

    pub async fn chunks_for_document(&self, doc_id: &str) -> Result<Vec<IndexedChunk>, AppError> {
        self.backend
            .chunks_for_document(doc_id)
            .await
            .map_err(unavailable)
    }

    pub async fn health(&self) -> Result<(), AppError> {
        self.backend.health().await.map_err(unavailable)
    }
}

/// Maps cosine similarity onto `[0, 1]`; opposite or undefined directions score 0.
pub fn relevance(cosine: f32) -> f32 {
    if cosine.is_nan() {
        0.0
    } else {
        cosine.clamp(0.0, 1.0)
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn unavailable(err: AppError) -> AppError {
    match err {
        AppError::IndexUnavailable(_) => err,
        other => {
            warn!(error = %other, "vector index backend failure");
            AppError::IndexUnavailable(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    use super::{memory::MemoryVectorBackend, *};
    use crate::utils::embedding::EmbeddingProvider;

    fn index() -> VectorIndex {
        VectorIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(EmbeddingProvider::new_hashed(128)),
        )
    }

    fn source(doc_id: &str) -> ChunkSource<'_> {
        ChunkSource {
            doc_id,
            file_name: "guide.md",
            stored_path: "data/uploads/guide.md",
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    struct BrokenBackend {
        healthy: AtomicBool,
    }

    #[async_trait]
    impl VectorBackend for BrokenBackend {
        fn label(&self) -> &'static str {
            "broken"
        }

        async fn replace_document(
            &self,
            _doc_id: &str,
            _entries: Vec<IndexedChunk>,
        ) -> Result<(), AppError> {
            Err(AppError::InternalError("disk full".into()))
        }

        async fn delete_document(&self, _doc_id: &str) -> Result<(), AppError> {
            Err(AppError::InternalError("disk full".into()))
        }

        async fn query(
            &self,
            _embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<RetrievedChunk>, AppError> {
            Err(AppError::InternalError("connection reset".into()))
        }

        async fn chunks_for_document(
            &self,
            _doc_id: &str,
        ) -> Result<Vec<IndexedChunk>, AppError> {
            Ok(Vec::new())
        }

        async fn health(&self) -> Result<(), AppError> {
            if self.healthy.load(AtomicOrdering::SeqCst) {
                Ok(())
            } else {
                Err(AppError::InternalError("down".into()))
            }
        }
    }

    #[tokio::test]
    async fn upsert_assigns_sequential_chunk_ids() {
        let index = index();
        let count = index
            .upsert(source("doc-a"), &texts(&["first part", "second part"]))
            .await
            .expect("upsert");

        assert_eq!(count, 2);
        let stored = index.chunks_for_document("doc-a").await.expect("chunks");
        let ids: Vec<_> = stored.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, ["doc-a:0", "doc-a:1"]);
        assert!(stored.iter().all(|c| c.file_name == "guide.md"));
    }

    #[tokio::test]
    async fn upsert_replaces_previous_chunk_set() {
        let index = index();
        index
            .upsert(source("doc-a"), &texts(&["one", "two", "three"]))
            .await
            .expect("first upsert");
        index
            .upsert(source("doc-a"), &texts(&["only chunk"]))
            .await
            .expect("second upsert");

        let stored = index.chunks_for_document("doc-a").await.expect("chunks");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "only chunk");
    }

    #[tokio::test]
    async fn upsert_with_no_chunks_clears_document() {
        let index = index();
        index
            .upsert(source("doc-a"), &texts(&["something"]))
            .await
            .expect("upsert");
        let count = index.upsert(source("doc-a"), &[]).await.expect("empty upsert");

        assert_eq!(count, 0);
        assert!(index
            .chunks_for_document("doc-a")
            .await
            .expect("chunks")
            .is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let index = index();
        index.delete("missing").await.expect("delete missing");
        index
            .upsert(source("doc-a"), &texts(&["text"]))
            .await
            .expect("upsert");
        index.delete("doc-a").await.expect("delete");
        index.delete("doc-a").await.expect("delete again");
        assert!(index
            .chunks_for_document("doc-a")
            .await
            .expect("chunks")
            .is_empty());
    }

    #[tokio::test]
    async fn search_orders_by_score_and_respects_top_k() {
        let index = index();
        index
            .upsert(
                source("doc-a"),
                &texts(&[
                    "configure the server with a config file",
                    "bananas are yellow",
                    "the server config lives in config.toml",
                ]),
            )
            .await
            .expect("upsert");

        let results = index
            .search("server config", 2, 0.0)
            .await
            .expect("search");
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert!(results.iter().all(|r| r.text.contains("config")));
    }

    #[tokio::test]
    async fn raising_threshold_never_adds_results() {
        let index = index();
        index
            .upsert(
                source("doc-a"),
                &texts(&["alpha beta gamma", "alpha delta", "omega"]),
            )
            .await
            .expect("upsert");

        let mut previous = usize::MAX;
        for threshold in [0.0, 0.1, 0.3, 0.6, 0.9, 1.0] {
            let results = index.search("alpha", 3, threshold).await.expect("search");
            assert!(results.len() <= previous);
            assert!(results.iter().all(|r| r.score >= threshold));
            previous = results.len();
        }
    }

    #[tokio::test]
    async fn search_on_empty_index_is_empty() {
        let results = index().search("anything", 4, 0.2).await.expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn backend_failures_surface_as_unavailable() {
        let index = VectorIndex::new(
            Arc::new(BrokenBackend {
                healthy: AtomicBool::new(false),
            }),
            Arc::new(EmbeddingProvider::new_hashed(8)),
        );

        let err = index.search("q", 4, 0.2).await.expect_err("search fails");
        assert!(matches!(err, AppError::IndexUnavailable(_)));

        let err = index
            .upsert(source("doc"), &texts(&["x"]))
            .await
            .expect_err("upsert fails");
        assert!(matches!(err, AppError::IndexUnavailable(_)));

        assert!(matches!(
            index.health().await,
            Err(AppError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn relevance_is_bounded() {
        assert!((relevance(0.91) - 0.91).abs() < f32::EPSILON);
        assert_eq!(relevance(-0.4), 0.0);
        assert_eq!(relevance(1.2), 1.0);
        assert_eq!(relevance(f32::NAN), 0.0);
    }
}
