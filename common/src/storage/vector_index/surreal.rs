use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{IndexedChunk, RetrievedChunk, VectorBackend};
use crate::{error::AppError, storage::db::SurrealDbClient};

pub const VECTOR_CHUNK_TABLE: &str = "vector_chunk";

pub const VECTOR_CHUNK_SCHEMA: &str = r"
    DEFINE TABLE IF NOT EXISTS vector_chunk SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS idx_vector_chunk_doc ON TABLE vector_chunk FIELDS doc_id;
";

const REPLACE_DOCUMENT: &str = r"
    BEGIN TRANSACTION;
    DELETE vector_chunk WHERE doc_id = $doc_id;
    INSERT INTO vector_chunk $records;
    COMMIT TRANSACTION;
";

const DELETE_DOCUMENT: &str = "DELETE vector_chunk WHERE doc_id = $doc_id;";

const DOCUMENT_CHUNKS: &str = r"
    SELECT doc_id, file_name, stored_path, chunk_index, chunk_id, text, embedding
    FROM vector_chunk
    WHERE doc_id = $doc_id
    ORDER BY chunk_index ASC;
";

#[derive(Debug, Deserialize)]
struct ScoredRow {
    doc_id: String,
    file_name: String,
    chunk_id: String,
    text: String,
    score: f64,
}

/// Vector backend on a SurrealDB table, scored with `vector::similarity::cosine`.
pub struct SurrealVectorBackend {
    db: Arc<SurrealDbClient>,
}

impl SurrealVectorBackend {
    pub async fn new(db: Arc<SurrealDbClient>) -> Result<Self, AppError> {
        db.ensure_initialized().await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl VectorBackend for SurrealVectorBackend {
    fn label(&self) -> &'static str {
        "surrealdb"
    }

    async fn replace_document(
        &self,
        doc_id: &str,
        entries: Vec<IndexedChunk>,
    ) -> Result<(), AppError> {
        if entries.is_empty() {
            return self.delete_document(doc_id).await;
        }

        self.db
            .query(REPLACE_DOCUMENT)
            .bind(("doc_id", doc_id.to_owned()))
            .bind(("records", entries))
            .await?
            .check()?;

        Ok(())
    }

    async fn delete_document(&self, doc_id: &str) -> Result<(), AppError> {
        self.db
            .query(DELETE_DOCUMENT)
            .bind(("doc_id", doc_id.to_owned()))
            .await?
            .check()?;

        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let query = format!(
            "SELECT doc_id, file_name, chunk_id, text, \
             vector::similarity::cosine(embedding, $embedding) AS score \
             FROM {VECTOR_CHUNK_TABLE} ORDER BY score DESC LIMIT {limit}"
        );

        let mut response = self
            .db
            .query(query)
            .bind(("embedding", embedding.to_vec()))
            .await?
            .check()?;
        let rows: Vec<ScoredRow> = response.take(0)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                #[allow(clippy::cast_possible_truncation)]
                let score = row.score as f32;
                RetrievedChunk {
                    doc_id: row.doc_id,
                    file_name: row.file_name,
                    chunk_id: row.chunk_id,
                    score,
                    text: row.text,
                }
            })
            .collect())
    }

    async fn chunks_for_document(&self, doc_id: &str) -> Result<Vec<IndexedChunk>, AppError> {
        let mut response = self
            .db
            .query(DOCUMENT_CHUNKS)
            .bind(("doc_id", doc_id.to_owned()))
            .await?
            .check()?;

        Ok(response.take(0)?)
    }

    async fn health(&self) -> Result<(), AppError> {
        self.db.query("RETURN true").await?.check()?;
        Ok(())
    }
}
