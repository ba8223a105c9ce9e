use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

/// Splits `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Boundaries prefer the coarsest break that fits: blank lines, then line
/// breaks, sentences, words and finally single characters. Chunks are trimmed
/// and empty ones dropped.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, AppError> {
    Ok(chunk_spans(text, chunk_size, chunk_overlap)?
        .into_iter()
        .map(|(_, chunk)| chunk.to_owned())
        .collect())
}

/// Same as [`chunk_text`] but keeps each chunk's byte offset into `text`.
pub fn chunk_spans(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<(usize, &str)>, AppError> {
    if chunk_size == 0 {
        return Err(AppError::InvariantViolation(
            "chunk_size must be greater than zero".into(),
        ));
    }

    if chunk_overlap >= chunk_size {
        return Err(AppError::InvariantViolation(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let chunk_config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::InvariantViolation(format!("invalid chunk overlap: {e}")))?;
    let splitter = TextSplitter::new(chunk_config);

    Ok(splitter
        .chunk_indices(text)
        .filter(|(_, chunk)| !chunk.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_long_text_into_bounded_chunks() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(8);
        let chunks = chunk_text(&text, 40, 10).expect("chunking succeeds");

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| !chunk.trim().is_empty()));
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 40));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello", 800, 120).expect("chunking succeeds");
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph line.\n\nSecond paragraph line.";
        let chunks = chunk_text(text, 30, 0).expect("chunking succeeds");

        assert_eq!(
            chunks,
            vec![
                "First paragraph line.".to_string(),
                "Second paragraph line.".to_string()
            ]
        );
    }

    #[test]
    fn chunks_cover_all_content() {
        let text = "Alpha beta gamma.\nDelta epsilon zeta eta theta.\n\nIota kappa lambda mu nu xi omicron pi rho sigma tau.";
        let spans = chunk_spans(text, 24, 6).expect("chunking succeeds");

        let mut covered = vec![false; text.len()];
        for (offset, chunk) in &spans {
            assert_eq!(&text[*offset..offset + chunk.len()], *chunk);
            for flag in &mut covered[*offset..offset + chunk.len()] {
                *flag = true;
            }
        }

        for (idx, ch) in text.char_indices() {
            if !ch.is_whitespace() {
                assert!(covered[idx], "character {ch:?} at {idx} not covered");
            }
        }
    }

    #[test]
    fn oversized_word_is_split_by_characters() {
        let text = "a".repeat(25);
        let chunks = chunk_text(&text, 10, 2).expect("chunking succeeds");
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|chunk| chunk.len() <= 10));
    }

    #[test]
    fn whitespace_only_text_yields_no_chunks() {
        let chunks = chunk_text(" \n\n \t ", 10, 2).expect("chunking succeeds");
        assert!(chunks.is_empty());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            chunk_text("text", 10, 10),
            Err(AppError::InvariantViolation(_))
        ));
        assert!(matches!(
            chunk_text("text", 0, 0),
            Err(AppError::InvariantViolation(_))
        ));
    }
}
