//! SQLite-backed [`ChunkStore`] implementation.
//!
//! Each chunk is one row in `chunks`; its embedding is a little-endian
//! `f32` BLOB and its metadata the JSON form of [`ChunkMetadata`].
//! Vector search loads the (optionally source-filtered) rows and ranks
//! them by cosine similarity in process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use study_context_core::embedding::{blob_to_vec, vec_to_blob};
use study_context_core::filter::ChunkFilter;
use study_context_core::models::{Chunk, ChunkMetadata, ScoredChunk, SourceSummary};
use study_context_core::store::{rank_by_similarity, ChunkStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_rows(&self, filter: Option<&ChunkFilter>) -> Result<Vec<Chunk>> {
        let rows = match filter {
            Some(ChunkFilter::Source(source)) => {
                sqlx::query(
                    "SELECT source, chunk_index, text, embedding FROM chunks WHERE source = ? ORDER BY id",
                )
                .bind(source)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT source, chunk_index, text, embedding FROM chunks ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_chunk).collect()
    }
}

fn row_to_chunk(row: &SqliteRow) -> Result<Chunk> {
    let chunk_index: i64 = row.try_get("chunk_index")?;
    let blob: Vec<u8> = row.try_get("embedding")?;
    Ok(Chunk {
        text: row.try_get("text")?,
        source_id: row.try_get("source")?,
        chunk_index: usize::try_from(chunk_index)
            .with_context(|| format!("negative chunk_index {} in chunks table", chunk_index))?,
        embedding: blob_to_vec(&blob),
    })
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            let metadata: ChunkMetadata = chunk.metadata();
            sqlx::query(
                r#"
                INSERT INTO chunks (source, chunk_index, text, embedding, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.source_id)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(serde_json::to_string(&metadata)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let candidates = self.fetch_rows(filter).await?;
        Ok(rank_by_similarity(query_vec, candidates, limit))
    }

    async fn chunks_matching(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>> {
        self.fetch_rows(Some(filter)).await
    }

    async fn list_sources(&self) -> Result<Vec<SourceSummary>> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS chunk_count FROM chunks GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SourceSummary> {
                let count: i64 = row.try_get("chunk_count")?;
                Ok(SourceSummary {
                    source_id: row.try_get("source")?,
                    chunk_count: count.max(0) as usize,
                })
            })
            .collect()
    }
}
