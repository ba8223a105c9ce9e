use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use mime_guess::from_path;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::stored_file::StoredFile;
use crate::utils::ingest_limits::validate_upload;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unsupported file extension '{0}'. Allowed: .md, .pdf, .txt")]
    UnsupportedType(String),

    #[error("Uploaded file is empty")]
    EmptyInput,

    #[error("Uploaded file exceeds size limit ({0} bytes)")]
    TooLarge(usize),

    #[error("IO error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Failed to encode metadata: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl StorageError {
    /// True for rejections caused by the upload itself rather than the store.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType(_) | Self::EmptyInput | Self::TooLarge(_)
        )
    }
}

type Manifest = BTreeMap<String, StoredFile>;

/// Content-addressed upload store.
///
/// Every upload is identified by the sha256 of its bytes. The manifest lives in
/// memory behind a single mutex and is rewritten in full on every change, so
/// concurrent saves never lose each other's entries.
pub struct ContentStore {
    uploads_dir: PathBuf,
    max_upload_bytes: usize,
    manifest: Mutex<Manifest>,
}

impl ContentStore {
    pub async fn open(
        uploads_dir: impl Into<PathBuf>,
        max_upload_bytes: usize,
    ) -> Result<Self, StorageError> {
        let uploads_dir = uploads_dir.into();
        tokio::fs::create_dir_all(&uploads_dir).await?;

        let manifest = load_manifest(&uploads_dir.join(MANIFEST_FILE)).await;
        debug!(
            entries = manifest.len(),
            uploads_dir = %uploads_dir.display(),
            "content store opened"
        );

        Ok(Self {
            uploads_dir,
            max_upload_bytes,
            manifest: Mutex::new(manifest),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub async fn get(&self, doc_id: &str) -> Option<StoredFile> {
        self.manifest.lock().await.get(doc_id).cloned()
    }

    /// Persists `bytes` unless identical content is already stored.
    #[tracing::instrument(skip_all, fields(file_name = %file_name, size_bytes = bytes.len()))]
    pub async fn save(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        let suffix = validate_upload(file_name, bytes.len(), self.max_upload_bytes)?;
        let doc_id = get_sha(bytes);

        let mut manifest = self.manifest.lock().await;

        if let Some(existing) = manifest.get(&doc_id) {
            if tokio::fs::try_exists(&existing.stored_path)
                .await
                .unwrap_or(false)
            {
                info!(%doc_id, "File already exists with SHA256");
                return Ok(existing.clone().as_duplicate());
            }
            warn!(
                %doc_id,
                stored_path = %existing.stored_path,
                "manifest entry points to a missing file, storing a fresh copy"
            );
        }

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let stored_path = self.uploads_dir.join(stored_file_name(&doc_id, &suffix));
        tokio::fs::write(&stored_path, bytes).await?;

        let record = StoredFile {
            content_type: content_type
                .map(str::trim)
                .filter(|ct| !ct.is_empty())
                .map_or_else(|| guess_mime_type(Path::new(file_name)), str::to_owned),
            doc_id: doc_id.clone(),
            file_hash: doc_id.clone(),
            original_filename: file_name.to_owned(),
            size_bytes: bytes.len() as u64,
            stored_path: stored_path.to_string_lossy().into_owned(),
            uploaded_at: Utc::now(),
            is_duplicate: false,
        };

        let sidecar = sidecar_path(&stored_path);
        if let Err(err) = write_json_atomic(&sidecar, &record) {
            discard_files(&[stored_path.as_path(), sidecar.as_path()]).await;
            return Err(err);
        }

        let previous = manifest.insert(doc_id.clone(), record.clone());
        if let Err(err) = write_json_atomic(&self.uploads_dir.join(MANIFEST_FILE), &*manifest) {
            match previous {
                Some(entry) => manifest.insert(doc_id, entry),
                None => manifest.remove(&doc_id),
            };
            discard_files(&[stored_path.as_path(), sidecar.as_path()]).await;
            return Err(err);
        }
        drop(manifest);

        debug!(
            doc_id = %record.doc_id,
            stored_path = %record.stored_path,
            "upload persisted"
        );

        Ok(record)
    }
}

/// Calculates the SHA256 hash of the given bytes as lowercase hex.
pub fn get_sha(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn stored_file_name(doc_id: &str, suffix: &str) -> String {
    let prefix = doc_id.get(..12).unwrap_or(doc_id);
    format!("{prefix}-{}{suffix}", Uuid::new_v4().simple())
}

fn sidecar_path(stored_path: &Path) -> PathBuf {
    let mut name = stored_path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Best-effort removal of files written by a save that did not commit.
async fn discard_files(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove uncommitted upload file");
            }
        }
    }
}

fn guess_mime_type(path: &Path) -> String {
    from_path(path)
        .first_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}

async fn load_manifest(path: &Path) -> Manifest {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Manifest::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "manifest unreadable, starting empty");
            return Manifest::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "manifest is not valid JSON, starting empty");
        Manifest::new()
    })
}

/// Writes the whole document to a sibling temp file, then renames it over `path`.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path)?;
    Ok(())
}
