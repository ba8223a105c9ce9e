use common::{error::AppError, storage::types::stored_file::StoredFile};
use tracing::error;

use super::{config::IngestionConfig, outcome::UploadedFile, services::PipelineServices};

pub struct PipelineContext<'a> {
    pub upload: &'a UploadedFile,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub stored: Option<StoredFile>,
    pub text: Option<String>,
    pub chunks: Vec<String>,
    pub chunks_count: usize,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        upload: &'a UploadedFile,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        Self {
            upload,
            pipeline_config,
            services,
            stored: None,
            text: None,
            chunks: Vec::new(),
            chunks_count: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }

    pub fn stored(&self) -> Result<&StoredFile, AppError> {
        self.stored
            .as_ref()
            .ok_or_else(|| AppError::InternalError("stored file expected to be available".into()))
    }

    pub fn text(&self) -> Result<&str, AppError> {
        self.text
            .as_deref()
            .ok_or_else(|| AppError::InternalError("extracted text expected to be available".into()))
    }

    pub fn take_stored(&mut self) -> Result<StoredFile, AppError> {
        self.stored.take().ok_or_else(|| {
            AppError::InternalError("stored file expected to be available for the outcome".into())
        })
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            file_name = %self.upload.file_name,
            doc_id = self.stored.as_ref().map_or("", |stored| stored.doc_id.as_str()),
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }
}
