use bytes::Bytes;
use common::{
    error::{AppError, ErrorKind},
    storage::types::stored_file::StoredFile,
};
use serde::Serialize;

pub const PROCESSED_DETAIL: &str = "Indexed successfully";
pub const UNEXPECTED_FAILURE_DETAIL: &str = "Unexpected ingestion failure";

/// One file as received from the caller, before anything is persisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processed,
    Failed,
}

/// Per-file result of an ingestion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub status: FileStatus,
    pub original_filename: String,
    pub detail: Option<String>,
    pub doc_id: Option<String>,
    pub file_hash: Option<String>,
    pub stored_path: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub chunks_count: usize,
    pub is_duplicate: bool,
}

impl FileOutcome {
    pub fn processed(stored: StoredFile, chunks_count: usize) -> Self {
        Self {
            status: FileStatus::Processed,
            original_filename: stored.original_filename,
            detail: Some(PROCESSED_DETAIL.to_string()),
            doc_id: Some(stored.doc_id),
            file_hash: Some(stored.file_hash),
            stored_path: Some(stored.stored_path),
            content_type: Some(stored.content_type),
            size_bytes: Some(stored.size_bytes),
            chunks_count,
            is_duplicate: stored.is_duplicate,
        }
    }

    /// Failed entry for a file that was part of a multi-file batch.
    pub fn failed(original_filename: impl Into<String>, err: &AppError) -> Self {
        let detail = if err.kind() == ErrorKind::Internal {
            UNEXPECTED_FAILURE_DETAIL.to_string()
        } else {
            err.public_detail()
        };

        Self {
            status: FileStatus::Failed,
            original_filename: original_filename.into(),
            detail: Some(detail),
            doc_id: None,
            file_hash: None,
            stored_path: None,
            content_type: None,
            size_bytes: None,
            chunks_count: 0,
            is_duplicate: false,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == FileStatus::Processed
    }
}
