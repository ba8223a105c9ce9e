use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{
        content_store::ContentStore,
        types::stored_file::StoredFile,
        vector_index::{ChunkSource, VectorIndex},
    },
};

use super::{config::IngestionConfig, outcome::UploadedFile};
use crate::utils::{chunking::chunk_text, file_text_extraction::extract_text_from_file};

/// The collaborators a pipeline run calls into, one method per stage.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn store_upload(&self, upload: &UploadedFile) -> Result<StoredFile, AppError>;

    async fn extract_text(&self, stored: &StoredFile) -> Result<String, AppError>;

    async fn chunk_text(
        &self,
        text: &str,
        config: &IngestionConfig,
    ) -> Result<Vec<String>, AppError>;

    async fn index_chunks(&self, stored: &StoredFile, chunks: &[String])
        -> Result<usize, AppError>;

    /// Number of chunks the index currently holds for `doc_id`.
    async fn indexed_chunk_count(&self, doc_id: &str) -> Result<usize, AppError>;
}

pub struct DefaultPipelineServices {
    content_store: Arc<ContentStore>,
    index: VectorIndex,
}

impl DefaultPipelineServices {
    pub fn new(content_store: Arc<ContentStore>, index: VectorIndex) -> Self {
        Self {
            content_store,
            index,
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn store_upload(&self, upload: &UploadedFile) -> Result<StoredFile, AppError> {
        Ok(self
            .content_store
            .save(
                &upload.bytes,
                &upload.file_name,
                upload.content_type.as_deref(),
            )
            .await?)
    }

    async fn extract_text(&self, stored: &StoredFile) -> Result<String, AppError> {
        extract_text_from_file(Path::new(&stored.stored_path)).await
    }

    async fn chunk_text(
        &self,
        text: &str,
        config: &IngestionConfig,
    ) -> Result<Vec<String>, AppError> {
        chunk_text(text, config.chunk_size, config.chunk_overlap)
    }

    async fn index_chunks(
        &self,
        stored: &StoredFile,
        chunks: &[String],
    ) -> Result<usize, AppError> {
        let source = ChunkSource {
            doc_id: &stored.doc_id,
            file_name: &stored.original_filename,
            stored_path: &stored.stored_path,
        };
        self.index.upsert(source, chunks).await
    }

    async fn indexed_chunk_count(&self, doc_id: &str) -> Result<usize, AppError> {
        Ok(self.index.chunks_for_document(doc_id).await?.len())
    }
}
