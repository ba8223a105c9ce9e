use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{cosine_similarity, IndexedChunk, RetrievedChunk, VectorBackend};
use crate::error::AppError;

/// In-process backend. Each document's chunk set is swapped under one write lock.
#[derive(Default)]
pub struct MemoryVectorBackend {
    documents: RwLock<HashMap<String, Vec<IndexedChunk>>>,
}

impl MemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorBackend for MemoryVectorBackend {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn replace_document(
        &self,
        doc_id: &str,
        entries: Vec<IndexedChunk>,
    ) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        if entries.is_empty() {
            documents.remove(doc_id);
        } else {
            documents.insert(doc_id.to_owned(), entries);
        }
        Ok(())
    }

    async fn delete_document(&self, doc_id: &str) -> Result<(), AppError> {
        self.documents.write().await.remove(doc_id);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let documents = self.documents.read().await;

        let mut scored = Vec::new();
        for chunk in documents.values().flatten() {
            if chunk.embedding.len() != embedding.len() {
                return Err(AppError::IndexUnavailable(format!(
                    "embedding dimension mismatch: stored {}, query {}",
                    chunk.embedding.len(),
                    embedding.len()
                )));
            }
            scored.push((cosine_similarity(&chunk.embedding, embedding), chunk));
        }

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, chunk)| RetrievedChunk {
                doc_id: chunk.doc_id.clone(),
                file_name: chunk.file_name.clone(),
                chunk_id: chunk.chunk_id.clone(),
                score,
                text: chunk.text.clone(),
            })
            .collect())
    }

    async fn chunks_for_document(&self, doc_id: &str) -> Result<Vec<IndexedChunk>, AppError> {
        let mut chunks = self
            .documents
            .read()
            .await
            .get(doc_id)
            .cloned()
            .unwrap_or_default();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        Ok(chunks)
    }

    async fn health(&self) -> Result<(), AppError> {
        Ok(())
    }
}
