use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one physical upload, keyed by the sha256 of its bytes.
///
/// Fields are declared in lexical order so manifest and sidecar documents
/// come out with sorted keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    pub content_type: String,
    pub doc_id: String,
    pub file_hash: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
    /// Set when the upload resolved to an existing, still-present file.
    #[serde(skip)]
    pub is_duplicate: bool,
}

impl StoredFile {
    pub fn as_duplicate(mut self) -> Self {
        self.is_duplicate = true;
        self
    }
}
