use std::{panic, path::Path};

use common::error::{AppError, ExtractionError};
use lopdf::Document;
use tracing::{debug, warn};

/// Extracts the text layer of a PDF, one page per line block.
///
/// Pages are read with `lopdf`; when that yields nothing, `pdf-extract` gets a
/// second attempt. A document that still has no text fails with
/// [`ExtractionError::UnparsablePdf`].
pub async fn extract_pdf_content(file_path: &Path) -> Result<String, AppError> {
    let pdf_bytes = tokio::fs::read(file_path)
        .await
        .map_err(ExtractionError::Io)?;

    let text = tokio::task::spawn_blocking(move || extract_pages(&pdf_bytes)).await??;

    Ok(text)
}

fn extract_pages(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = Document::load_mem(pdf_bytes).map_err(|err| {
        debug!(error = %err, "failed to parse PDF structure");
        ExtractionError::UnparsablePdf
    })?;

    let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let pages: Vec<String> = page_numbers
        .iter()
        .map(|page| {
            document.extract_text(&[*page]).unwrap_or_else(|err| {
                debug!(page, error = %err, "page has no extractable text layer");
                String::new()
            })
        })
        .collect();

    let joined = pages.join("\n").trim().to_string();
    if !joined.is_empty() {
        return Ok(joined);
    }

    let fallback = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf_bytes));
    match fallback {
        Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Ok(Ok(_)) => Err(ExtractionError::UnparsablePdf),
        Ok(Err(err)) => {
            debug!(error = %err, "pdf-extract could not read document");
            Err(ExtractionError::UnparsablePdf)
        }
        Err(_) => {
            warn!("pdf-extract panicked while reading document");
            Err(ExtractionError::UnparsablePdf)
        }
    }
}
