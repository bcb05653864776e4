//! Vector adapter (§2 component 3): embedding + nearest-neighbour query. Embedding
//! generation is lifted almost verbatim from `recommendation/engine.rs`
//! (`fastembed` + `text-splitter`, run inside `spawn_blocking` because `TextEmbedding`
//! is a synchronous, CPU-bound model). Nearest-neighbour query is `pgvector` cosine
//! distance over the same Postgres instance the edge-cache adapter uses, the same
//! way article chunks and their vectors live in one Diesel-managed table there.

use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use diesel::sql_types::{Integer, Text};
use diesel::QueryableByName;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use text_splitter::MarkdownSplitter;

pub type PgVector = pgvector::sql_types::Vector;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds `title\n<cleaned[:500]>` per §4.6 and returns the raw vector.
    async fn embed(&self, title: &str, text: &str) -> eyre::Result<Vec<f32>>;

    /// Upserts an embedding under a logical id (`article_<id>`, §4.6).
    async fn upsert(&self, embedding_id: &str, embedding: Vec<f32>) -> eyre::Result<()>;

    /// §4.12: `topK` nearest neighbours by cosine distance, closest first.
    async fn query_top_k(&self, embedding: Vec<f32>, top_k: usize) -> eyre::Result<Vec<(String, f32)>>;
}

static EMBEDDING_MODEL: LazyLock<eyre::Result<Arc<Mutex<TextEmbedding>>>> = LazyLock::new(|| {
    TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML12V2))
        .map(|model| Arc::new(Mutex::new(model)))
        .map_err(|err| eyre::eyre!("failed to initialise embedding model: {err}"))
});

fn embedding_model() -> eyre::Result<Arc<Mutex<TextEmbedding>>> {
    EMBEDDING_MODEL
        .as_ref()
        .map(Arc::clone)
        .map_err(|err| eyre::eyre!("embedding model unavailable: {err}"))
}

#[derive(QueryableByName)]
struct NeighbourRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Integer)]
    distance_milli: i32,
}

pub struct FastEmbedVectorIndex {
    pool: diesel_async::pooled_connection::deadpool::Pool<AsyncPgConnection>,
}

impl FastEmbedVectorIndex {
    pub fn new(pool: diesel_async::pooled_connection::deadpool::Pool<AsyncPgConnection>) -> Self {
        FastEmbedVectorIndex { pool }
    }

    /// §4.6: chunk `title\n<cleaned text>` the same way articles get chunked
    /// before embedding (512..768 tokens, capped at 64 chunks), but we only ever need
    /// the first chunk here since callers already pass a ≤500-char excerpt.
    async fn generate(&self, title: &str, text: &str) -> eyre::Result<Vec<f32>> {
        let model = embedding_model()?;
        let title = title.to_string();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let splitter = MarkdownSplitter::new(64..512);
            let chunk = splitter
                .chunks(&text)
                .next()
                .unwrap_or(&text)
                .to_string();
            let input = format!("Title: {title}\n{chunk}");

            let guard = model.lock().map_err(|_| eyre::eyre!("embedding model mutex poisoned"))?;
            let mut embeddings = guard
                .embed(vec![input], None)
                .map_err(|err| eyre::eyre!("embedding generation failed: {err}"))?;
            embeddings
                .pop()
                .ok_or_else(|| eyre::eyre!("embedding model returned no vectors"))
        })
        .await
        .map_err(|err| eyre::eyre!("embedding task panicked: {err}"))?
    }
}

#[async_trait]
impl VectorIndex for FastEmbedVectorIndex {
    async fn embed(&self, title: &str, text: &str) -> eyre::Result<Vec<f32>> {
        self.generate(title, text).await
    }

    async fn upsert(&self, embedding_id: &str, embedding: Vec<f32>) -> eyre::Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| eyre::eyre!("could not acquire edge-cache connection: {err}"))?;
        let vector = pgvector::Vector::from(embedding);
        diesel::sql_query(
            "UPDATE articles SET embedding = $1 WHERE id = $2",
        )
        .bind::<crate::adapters::vector_index::PgVector, _>(vector)
        .bind::<Text, _>(embedding_id.trim_start_matches("article_"))
        .execute(&mut conn)
        .await
        .map_err(|err| eyre::eyre!("vector upsert failed: {err}"))?;
        Ok(())
    }

    async fn query_top_k(&self, embedding: Vec<f32>, top_k: usize) -> eyre::Result<Vec<(String, f32)>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| eyre::eyre!("could not acquire edge-cache connection: {err}"))?;
        let vector = pgvector::Vector::from(embedding);
        let rows: Vec<NeighbourRow> = diesel::sql_query(
            "SELECT id, CAST((1 - (embedding <=> $1)) * 1000 AS INTEGER) AS distance_milli \
             FROM articles WHERE embedding IS NOT NULL \
             ORDER BY embedding <=> $1 LIMIT $2",
        )
        .bind::<crate::adapters::vector_index::PgVector, _>(vector)
        .bind::<Integer, _>(top_k as i32)
        .load(&mut conn)
        .await
        .map_err(|err| eyre::eyre!("vector query failed: {err}"))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.id, row.distance_milli as f32 / 1000.0))
            .collect())
    }
}

/// In-memory fake: stores vectors and does a brute-force cosine scan, enough for
/// clusterer/search tests that need a handful of articles.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    vectors: std::sync::Mutex<std::collections::HashMap<String, Vec<f32>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn embed(&self, title: &str, text: &str) -> eyre::Result<Vec<f32>> {
        // Deterministic bag-of-hashed-words embedding, good enough for cosine-similarity
        // tests without pulling the real model into unit tests.
        let mut vec = vec![0.0f32; 32];
        for word in format!("{title} {text}").split_whitespace() {
            let mut hash: u32 = 2166136261;
            for b in word.bytes() {
                hash ^= b as u32;
                hash = hash.wrapping_mul(16777619);
            }
            vec[(hash as usize) % 32] += 1.0;
        }
        Ok(vec)
    }

    async fn upsert(&self, embedding_id: &str, embedding: Vec<f32>) -> eyre::Result<()> {
        self.vectors.lock().unwrap().insert(embedding_id.to_string(), embedding);
        Ok(())
    }

    async fn query_top_k(&self, embedding: Vec<f32>, top_k: usize) -> eyre::Result<Vec<(String, f32)>> {
        let store = self.vectors.lock().unwrap();
        let mut scored: Vec<(String, f32)> = store
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(&embedding, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip_ranks_closest_first() {
        let index = InMemoryVectorIndex::new();
        let a = index.embed("Zimbabwe economy", "grows steadily").await.unwrap();
        let b = index.embed("Recipe for bread", "flour water yeast").await.unwrap();
        index.upsert("article_1", a.clone()).await.unwrap();
        index.upsert("article_2", b).await.unwrap();

        let results = index.query_top_k(a, 2).await.unwrap();
        assert_eq!(results[0].0, "article_1");
    }
}
