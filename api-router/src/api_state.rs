use std::sync::Arc;

use common::{storage::vector_index::VectorIndex, utils::config::AppConfig};
use ingestion_pipeline::IngestionPipeline;
use retrieval_pipeline::RagOrchestrator;

/// Shared handles for every `/api/v1` route, built once by the composition root.
#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub ingestion: Arc<IngestionPipeline>,
    pub rag: Arc<RagOrchestrator>,
    pub index: VectorIndex,
}

impl ApiState {
    pub fn new(
        config: AppConfig,
        ingestion: Arc<IngestionPipeline>,
        rag: Arc<RagOrchestrator>,
        index: VectorIndex,
    ) -> Self {
        Self {
            config,
            ingestion,
            rag,
            index,
        }
    }
}
