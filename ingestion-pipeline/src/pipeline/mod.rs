mod config;
mod context;
mod outcome;
mod services;
mod stages;
mod state;

pub use config::IngestionConfig;
pub use outcome::{FileOutcome, FileStatus, UploadedFile, PROCESSED_DETAIL, UNEXPECTED_FAILURE_DETAIL};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{content_store::ContentStore, vector_index::VectorIndex},
};
use tracing::{debug, info, warn};

use self::{
    context::PipelineContext,
    stages::{chunk, extract, index, reuse_indexed, store_upload},
    state::ready,
};

/// Turns uploads into indexed chunks: store, extract, chunk, index.
///
/// Each file runs through the stages in order and the first failing stage
/// ends that file's run.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(
        content_store: Arc<ContentStore>,
        index: VectorIndex,
        pipeline_config: IngestionConfig,
    ) -> Self {
        let services = DefaultPipelineServices::new(content_store, index);
        Self::with_services(pipeline_config, Arc::new(services))
    }

    pub fn with_services(
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.pipeline_config
    }

    /// Ingests a single file and returns its processed outcome, or the failure.
    #[tracing::instrument(
        skip_all,
        fields(file_name = %upload.file_name, size_bytes = upload.bytes.len())
    )]
    pub async fn ingest_one(&self, upload: &UploadedFile) -> Result<FileOutcome, AppError> {
        let (outcome, timings) = self.drive_pipeline(upload).await.map_err(|err| {
            debug!(file_name = %upload.file_name, error = %err, "ingestion pipeline failed");
            err
        })?;

        info!(
            doc_id = outcome.doc_id.as_deref().unwrap_or_default(),
            chunks = outcome.chunks_count,
            duplicate = outcome.is_duplicate,
            total_ms = timings.total_ms,
            store_ms = timings.store_ms,
            extract_ms = timings.extract_ms,
            chunk_ms = timings.chunk_ms,
            index_ms = timings.index_ms,
            "Indexed file"
        );

        Ok(outcome)
    }

    /// Ingests files sequentially, in the order given.
    ///
    /// A lone file propagates its failure. With several files every failure is
    /// turned into a failed entry and the remaining files still run.
    #[tracing::instrument(skip_all, fields(files = uploads.len()))]
    pub async fn ingest_batch(&self, uploads: &[UploadedFile]) -> Result<Vec<FileOutcome>, AppError> {
        if let [upload] = uploads {
            return Ok(vec![self.ingest_one(upload).await?]);
        }

        let mut outcomes = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.ingest_one(upload).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    warn!(
                        file_name = %upload.file_name,
                        kind = ?err.kind(),
                        error = %err,
                        "file failed inside batch, continuing"
                    );
                    outcomes.push(FileOutcome::failed(upload.file_name.clone(), &err));
                }
            }
        }

        let processed = outcomes.iter().filter(|o| o.is_processed()).count();
        info!(
            processed,
            failed = outcomes.len() - processed,
            "ingestion batch finished"
        );

        Ok(outcomes)
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    async fn drive_pipeline(
        &self,
        upload: &UploadedFile,
    ) -> Result<(FileOutcome, StageTimings), AppError> {
        let mut ctx = PipelineContext::new(upload, &self.pipeline_config, self.services.as_ref());
        let mut timings = StageTimings::default();

        let machine = ready();
        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = store_upload(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        timings.store_ms = Self::duration_millis(stage_start.elapsed());

        let reuse = reuse_indexed(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;

        let _machine = match reuse {
            Ok(indexed) => indexed,
            Err(machine) => {
                let stage_start = Instant::now();
                let machine = extract(machine, &mut ctx)
                    .await
                    .map_err(|err| ctx.abort(err))?;
                timings.extract_ms = Self::duration_millis(stage_start.elapsed());

                let stage_start = Instant::now();
                let machine = chunk(machine, &mut ctx)
                    .await
                    .map_err(|err| ctx.abort(err))?;
                timings.chunk_ms = Self::duration_millis(stage_start.elapsed());

                let stage_start = Instant::now();
                let machine = index(machine, &mut ctx)
                    .await
                    .map_err(|err| ctx.abort(err))?;
                timings.index_ms = Self::duration_millis(stage_start.elapsed());
                machine
            }
        };

        timings.total_ms = Self::duration_millis(pipeline_started.elapsed());

        let chunks_count = ctx.chunks_count;
        let stored = ctx.take_stored().map_err(|err| ctx.abort(err))?;

        Ok((FileOutcome::processed(stored, chunks_count), timings))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct StageTimings {
    total_ms: u64,
    store_ms: u64,
    extract_ms: u64,
    chunk_ms: u64,
    index_ms: u64,
}
