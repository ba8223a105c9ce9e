use std::path::Path;

use super::config::AppConfig;
use crate::storage::content_store::StorageError;

/// Extensions accepted for upload, lowercase with the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".md", ".pdf", ".txt"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestValidationError {
    BadRequest(String),
}

/// Lowercased extension of `file_name` including the dot, or an empty string.
pub fn file_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Checks a single upload against the type, emptiness and size constraints.
/// Returns the normalised suffix on success.
pub fn validate_upload(
    file_name: &str,
    size_bytes: usize,
    max_bytes: usize,
) -> Result<String, StorageError> {
    let suffix = file_suffix(file_name);
    if !ALLOWED_EXTENSIONS.contains(&suffix.as_str()) {
        let shown = if suffix.is_empty() {
            "<none>".to_string()
        } else {
            suffix
        };
        return Err(StorageError::UnsupportedType(shown));
    }

    if size_bytes == 0 {
        return Err(StorageError::EmptyInput);
    }

    if size_bytes > max_bytes {
        return Err(StorageError::TooLarge(max_bytes));
    }

    Ok(suffix)
}

/// Request-level limits applied before any file is touched.
pub fn validate_ingest_input(
    config: &AppConfig,
    file_count: usize,
) -> Result<(), IngestValidationError> {
    if file_count == 0 {
        return Err(IngestValidationError::BadRequest(
            "No files provided".to_string(),
        ));
    }

    if file_count > config.ingest_max_files {
        return Err(IngestValidationError::BadRequest(format!(
            "Too many files. Maximum allowed is {}",
            config.ingest_max_files
        )));
    }

    Ok(())
}

/// Upper bound for a whole multipart request body.
pub fn max_request_body_bytes(config: &AppConfig) -> usize {
    const MULTIPART_OVERHEAD: usize = 64 * 1024;
    config
        .max_upload_size_bytes
        .saturating_mul(config.ingest_max_files.max(1))
        .saturating_add(MULTIPART_OVERHEAD)
}
