#![allow(clippy::missing_docs_in_private_items)]

pub mod answer_retrieval;
pub mod answer_retrieval_helper;
pub mod generation;

pub use answer_retrieval::{RagAnswer, RagOrchestrator, RagSource};
pub use generation::{generator_from_config, Generator, OllamaGenerator, OpenAiGenerator};
