use common::error::AppError;
use state_machines::core::GuardError;
use tracing::{debug, info, instrument};

use super::{
    context::PipelineContext,
    state::{Chunked, Extracted, Indexed, IngestionMachine, Ready, Stored},
};

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name()))]
pub async fn store_upload(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Stored>, AppError> {
    let stored = ctx.services.store_upload(ctx.upload).await?;

    debug!(
        doc_id = %stored.doc_id,
        stored_path = %stored.stored_path,
        size_bytes = stored.size_bytes,
        duplicate = stored.is_duplicate,
        "upload stored"
    );

    ctx.stored = Some(stored);

    machine
        .store()
        .map_err(|(_, guard)| map_guard_error("store", &guard))
}

/// Skips the remaining stages when a duplicate upload is already indexed.
///
/// Returns the machine unchanged when the document still has to be processed.
#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name()))]
pub async fn reuse_indexed(
    machine: IngestionMachine<(), Stored>,
    ctx: &mut PipelineContext<'_>,
) -> Result<Result<IngestionMachine<(), Indexed>, IngestionMachine<(), Stored>>, AppError> {
    let stored = ctx.stored()?;
    if !stored.is_duplicate {
        return Ok(Err(machine));
    }

    let doc_id = stored.doc_id.clone();
    let existing = ctx.services.indexed_chunk_count(&doc_id).await?;
    if existing == 0 {
        debug!(%doc_id, "duplicate upload has no indexed chunks, reprocessing");
        return Ok(Err(machine));
    }

    info!(%doc_id, chunks = existing, "duplicate upload already indexed");
    ctx.chunks_count = existing;

    machine
        .reuse()
        .map(Ok)
        .map_err(|(_, guard)| map_guard_error("reuse", &guard))
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name()))]
pub async fn extract(
    machine: IngestionMachine<(), Stored>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Extracted>, AppError> {
    let text = ctx.services.extract_text(ctx.stored()?).await?;
    if text.trim().is_empty() {
        return Err(AppError::NoExtractableText);
    }

    debug!(text_chars = text.chars().count(), "text extracted");
    ctx.text = Some(text);

    machine
        .extract()
        .map_err(|(_, guard)| map_guard_error("extract", &guard))
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name()))]
pub async fn chunk(
    machine: IngestionMachine<(), Extracted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Chunked>, AppError> {
    let chunks = ctx
        .services
        .chunk_text(ctx.text()?, ctx.pipeline_config)
        .await?;
    if chunks.is_empty() {
        return Err(AppError::InvariantViolation(
            "Chunking produced zero chunks".into(),
        ));
    }

    debug!(chunks = chunks.len(), "text chunked");
    ctx.chunks = chunks;

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name()))]
pub async fn index(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Indexed>, AppError> {
    let chunks = std::mem::take(&mut ctx.chunks);
    let indexed = ctx.services.index_chunks(ctx.stored()?, &chunks).await?;

    info!(chunks = indexed, "chunks indexed");
    ctx.chunks_count = indexed;

    machine
        .index()
        .map_err(|(_, guard)| map_guard_error("index", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}
