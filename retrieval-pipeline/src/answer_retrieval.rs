use std::sync::Arc;

use common::{
    error::AppError,
    storage::vector_index::{RetrievedChunk, VectorIndex},
    utils::config::AppConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{
    answer_retrieval_helper::{build_prompt, snippet, NO_CONTEXT_ANSWER},
    generation::Generator,
};

pub const EMPTY_MESSAGE_DETAIL: &str = "Message must not be empty";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSource {
    pub doc_id: String,
    pub file_name: String,
    pub chunk_id: String,
    pub score: f32,
    pub snippet: String,
}

impl From<&RetrievedChunk> for RagSource {
    fn from(chunk: &RetrievedChunk) -> Self {
        Self {
            doc_id: chunk.doc_id.clone(),
            file_name: chunk.file_name.clone(),
            chunk_id: chunk.chunk_id.clone(),
            score: chunk.score,
            snippet: snippet(&chunk.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub used_context: bool,
    pub sources: Vec<RagSource>,
}

impl RagAnswer {
    fn without_context() -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            used_context: false,
            sources: Vec::new(),
        }
    }
}

/// Answers questions from indexed documents.
///
/// Retrieval runs first; the generator is only called when at least one
/// chunk clears the score threshold.
pub struct RagOrchestrator {
    index: VectorIndex,
    generator: Arc<dyn Generator>,
    top_k: usize,
    score_threshold: f32,
}

impl RagOrchestrator {
    pub fn new(
        index: VectorIndex,
        generator: Arc<dyn Generator>,
        top_k: usize,
        score_threshold: f32,
    ) -> Self {
        Self {
            index,
            generator,
            top_k,
            score_threshold,
        }
    }

    pub fn from_config(index: VectorIndex, generator: Arc<dyn Generator>, config: &AppConfig) -> Self {
        Self::new(
            index,
            generator,
            config.retrieval_top_k,
            config.retrieval_score_threshold,
        )
    }

    pub fn generator_label(&self) -> &'static str {
        self.generator.label()
    }

    #[instrument(skip_all, fields(top_k = self.top_k, score_threshold = self.score_threshold))]
    pub async fn answer(&self, question: &str) -> Result<RagAnswer, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Validation(EMPTY_MESSAGE_DETAIL.into()));
        }

        let retrieved = self
            .index
            .search(question, self.top_k, self.score_threshold)
            .await
            .map_err(|err| {
                error!(error = %err, "vector retrieval failed");
                err
            })?;

        if retrieved.is_empty() {
            info!(retrieved = 0, used_context = false, "no chunk cleared the threshold");
            return Ok(RagAnswer::without_context());
        }

        let sources: Vec<RagSource> = retrieved.iter().map(RagSource::from).collect();
        let prompt = build_prompt(question, &retrieved);
        let answer = self.generator.generate(&prompt).await?;

        info!(
            retrieved = sources.len(),
            used_context = true,
            backend = self.generator.label(),
            "answered from context"
        );

        Ok(RagAnswer {
            answer,
            used_context: true,
            sources,
        })
    }

    /// Sends `message` to the generator as is, without retrieval.
    #[instrument(skip_all)]
    pub async fn chat(&self, message: &str) -> Result<String, AppError> {
        if message.trim().is_empty() {
            return Err(AppError::Validation(EMPTY_MESSAGE_DETAIL.into()));
        }

        Ok(self.generator.generate(message).await?)
    }
}
