use common::storage::vector_index::RetrievedChunk;

/// Returned verbatim when no chunk clears the relevance threshold.
pub const NO_CONTEXT_ANSWER: &str =
    "There is not enough information in the knowledge base to give a grounded answer to this question.";

pub const SNIPPET_CHARS: usize = 240;

/// Assembles the grounded prompt: instructions, question, labelled context, answer request.
pub fn build_prompt(question: &str, sources: &[RetrievedChunk]) -> String {
    let context = sources
        .iter()
        .map(|source| {
            format!(
                "[{}] file={} score={:.3}\n{}",
                source.chunk_id, source.file_name, source.score, source.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a backend assistant. Answer only from the provided context. \
         If the context is not sufficient, say so explicitly.\n\n\
         User question:\n{question}\n\n\
         Context:\n{context}\n\n\
         Give a short, precise answer."
    )
}

/// First [`SNIPPET_CHARS`] characters of `text`.
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk_id: &str, score: f32, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            doc_id: "doc".into(),
            file_name: "guide.md".into(),
            chunk_id: chunk_id.into(),
            score,
            text: text.into(),
        }
    }

    #[test]
    fn prompt_labels_every_chunk_in_order() {
        let prompt = build_prompt(
            "How to configure it?",
            &[
                chunk("doc:0", 0.91, "Set the port in config.toml."),
                chunk("doc:3", 0.4567, "Restart afterwards."),
            ],
        );

        let first = prompt
            .find("[doc:0] file=guide.md score=0.910\nSet the port in config.toml.")
            .expect("first chunk present");
        let second = prompt
            .find("[doc:3] file=guide.md score=0.457\nRestart afterwards.")
            .expect("second chunk present");
        assert!(first < second);
        assert!(prompt.contains("config.toml.\n\n[doc:3]"));
        assert!(prompt.contains("User question:\nHow to configure it?"));
        assert!(prompt.contains("Answer only from the provided context"));
        assert!(prompt.ends_with("Give a short, precise answer."));
    }

    #[test]
    fn snippet_is_bounded_by_characters() {
        let text = "ж".repeat(500);
        let cut = snippet(&text);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
        assert_eq!(snippet("short"), "short");
    }
}
