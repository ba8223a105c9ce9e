use axum::{extract::State, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::utils::ingest_limits::validate_ingest_input;
use ingestion_pipeline::{FileOutcome, UploadedFile};
use serde::Serialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    // Per-file size is enforced by the content store, the body limit caps the request.
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub files: Vec<FieldData<Bytes>>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<FileOutcome>,
}

pub async fn upload_files(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<Json<UploadResponse>, ApiError> {
    validate_ingest_input(&state.config, input.files.len())?;

    let uploads: Vec<UploadedFile> = input
        .files
        .into_iter()
        .map(|field| {
            UploadedFile::new(
                field.metadata.file_name.unwrap_or_default(),
                field.metadata.content_type,
                field.contents,
            )
        })
        .collect();

    info!(
        file_count = uploads.len(),
        total_bytes = uploads.iter().map(|u| u.bytes.len()).sum::<usize>(),
        "Received ingestion request"
    );

    let files = state.ingestion.ingest_batch(&uploads).await?;

    Ok(Json(UploadResponse { files }))
}
