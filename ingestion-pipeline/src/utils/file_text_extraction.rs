use std::path::Path;

use common::{
    error::{AppError, ExtractionError},
    utils::ingest_limits::file_suffix,
};

use super::pdf_ingestion::extract_pdf_content;

/// Reads a stored upload and returns its trimmed text, dispatched on extension.
///
/// Text and markdown are decoded as UTF-8 with invalid sequences replaced.
/// The result may be empty for text files; callers decide how to treat that.
pub async fn extract_text_from_file(path: &Path) -> Result<String, AppError> {
    let suffix = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(file_suffix)
        .unwrap_or_default();

    match suffix.as_str() {
        ".txt" | ".md" => {
            let bytes = tokio::fs::read(path).await.map_err(ExtractionError::Io)?;
            Ok(String::from_utf8_lossy(&bytes).trim().to_string())
        }
        ".pdf" => extract_pdf_content(path).await,
        "" => Err(ExtractionError::UnsupportedType("<none>".into()).into()),
        other => Err(ExtractionError::UnsupportedType(other.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_and_trims_markdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, "\n\n# Title\n\nBody text.\n  ")
            .await
            .expect("write");

        let text = extract_text_from_file(&path).await.expect("extracts");
        assert_eq!(text, "# Title\n\nBody text.");
    }

    #[tokio::test]
    async fn replaces_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latin1.TXT");
        tokio::fs::write(&path, b"caf\xe9 menu")
            .await
            .expect("write");

        let text = extract_text_from_file(&path).await.expect("extracts");
        assert!(text.starts_with("caf"));
        assert!(text.ends_with("menu"));
    }

    #[tokio::test]
    async fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sheet.csv");
        tokio::fs::write(&path, "a,b").await.expect("write");

        let err = extract_text_from_file(&path).await.expect_err("rejected");
        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::UnsupportedType(ref ext)) if ext == ".csv"
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = extract_text_from_file(&dir.path().join("gone.txt"))
            .await
            .expect_err("missing file");
        assert!(matches!(err, AppError::Extraction(ExtractionError::Io(_))));
    }
}
