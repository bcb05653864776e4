//! Search engine (§4.12): vector-first query, SQL-`LIKE` fallback on vector failure
//! or empty hits. Grounded in the same primary-then-replica fallback shape the
//! keyword extractor's dictionary loader uses, applied here to read paths instead
//! of a dictionary: try the richer source, degrade to the edge cache's SQL surface.

use chrono::{DateTime, Utc};

use crate::adapters::edge_cache::EdgeArticleRow;
use crate::adapters::{DocStore, EdgeCache, LlmGateway, VectorIndex};

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub source: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub want_insights: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Semantic,
    Keyword,
    None,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub insights: Option<Insight>,
    pub method: SearchMethod,
}

/// §4.12. Returns `method: none` with empty results when `query` is empty.
pub async fn search(
    doc_store: &dyn DocStore,
    edge_cache: &dyn EdgeCache,
    vector: &dyn VectorIndex,
    llm: &dyn LlmGateway,
    query: &str,
    options: &SearchOptions,
) -> SearchOutcome {
    if query.trim().is_empty() {
        return SearchOutcome {
            results: Vec::new(),
            insights: None,
            method: SearchMethod::None,
        };
    }

    let limit = options.limit.unwrap_or(DEFAULT_LIMIT);

    let semantic = try_semantic_search(doc_store, edge_cache, vector, query, options, limit).await;
    let (results, method) = match semantic {
        Some(results) if !results.is_empty() => (results, SearchMethod::Semantic),
        _ => (keyword_search(edge_cache, query, options, limit).await, SearchMethod::Keyword),
    };

    let insights = if options.want_insights && !results.is_empty() {
        summarise(llm, &results).await
    } else {
        None
    };

    SearchOutcome { results, insights, method }
}

async fn try_semantic_search(
    doc_store: &dyn DocStore,
    edge_cache: &dyn EdgeCache,
    vector: &dyn VectorIndex,
    query: &str,
    options: &SearchOptions,
    limit: i64,
) -> Option<Vec<SearchResult>> {
    let embedding = vector.embed(query, "").await.ok()?;
    let top_k = (limit as usize) * 2;
    let neighbours = vector.query_top_k(embedding, top_k).await.ok()?;
    if neighbours.is_empty() {
        return None;
    }

    let ids: Vec<String> = neighbours
        .iter()
        .map(|(id, _)| id.trim_start_matches("article_").to_string())
        .collect();

    let mut rows = fetch_from_primary(doc_store, &ids).await;
    if rows.is_empty() {
        rows = edge_cache
            .fetch_by_ids(&ids)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();
    }

    let mut scored: Vec<SearchResult> = neighbours
        .into_iter()
        .filter_map(|(id, score)| {
            let bare_id = id.trim_start_matches("article_").to_string();
            rows.get(&bare_id).map(|row| (row, score))
        })
        .filter(|(row, _)| matches_filters(row, options))
        .map(|(row, score)| SearchResult {
            id: row.id.clone(),
            title: row.title.clone(),
            score: Some(score),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit.max(0) as usize);
    Some(scored)
}

async fn fetch_from_primary(doc_store: &dyn DocStore, ids: &[String]) -> std::collections::HashMap<String, EdgeArticleRow> {
    let docs = doc_store
        .find("articles", serde_json::json!({"id": {"$in": ids}}), None, None)
        .await
        .unwrap_or_default();
    docs.into_iter()
        .filter_map(|d| {
            let id = d.get("id")?.as_str()?.to_string();
            let title = d.get("title")?.as_str()?.to_string();
            Some((
                id.clone(),
                EdgeArticleRow {
                    id,
                    slug: d.get("slug").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    title,
                    description: d.get("description").and_then(|v| v.as_str()).map(String::from),
                    source: d.get("source").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    category: d.get("category_id").and_then(|v| v.as_str()).map(String::from),
                    country: d.get("country_id").and_then(|v| v.as_str()).map(String::from),
                    published_at: d.get("published_at").and_then(|v| serde_json::from_value(v.clone()).ok()),
                },
            ))
        })
        .collect()
}

fn matches_filters(row: &EdgeArticleRow, options: &SearchOptions) -> bool {
    options.category.as_deref().is_none_or(|c| row.category.as_deref() == Some(c))
        && options.source.as_deref().is_none_or(|s| row.source == s)
        && options.date_from.is_none_or(|from| row.published_at.is_some_and(|p| p >= from))
        && options.date_to.is_none_or(|to| row.published_at.is_some_and(|p| p <= to))
}

async fn keyword_search(edge_cache: &dyn EdgeCache, query: &str, options: &SearchOptions, limit: i64) -> Vec<SearchResult> {
    edge_cache
        .search_like(
            query,
            options.category.as_deref(),
            options.source.as_deref(),
            options.date_from,
            options.date_to,
            limit,
        )
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|row| SearchResult {
            id: row.id,
            title: row.title,
            score: None,
        })
        .collect()
}

async fn summarise(llm: &dyn LlmGateway, results: &[SearchResult]) -> Option<Insight> {
    let titles: Vec<&str> = results.iter().take(5).map(|r| r.title.as_str()).collect();
    let prompt = format!(
        "Summarise the common theme across these news headlines in one sentence: {}",
        titles.join("; ")
    );
    let content = llm.complete(&prompt).await.ok()?;
    Some(Insight {
        kind: "summary".to_string(),
        content,
        confidence: 0.7,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::edge_cache::{EdgeArticleRow, InMemoryEdgeCache};
    use crate::adapters::llm_gateway::FakeLlmGateway;
    use crate::adapters::vector_index::InMemoryVectorIndex;

    #[tokio::test]
    async fn empty_query_returns_none_method() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        let vector = InMemoryVectorIndex::new();
        let llm = FakeLlmGateway::new(vec![]);
        let outcome = search(&doc_store, &edge_cache, &vector, &llm, "", &SearchOptions::default()).await;
        assert_eq!(outcome.method, SearchMethod::None);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_like_search_when_vector_index_is_empty() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        edge_cache
            .upsert_articles(vec![EdgeArticleRow {
                id: "1".into(),
                slug: "s".into(),
                title: "Zimbabwe economy grows".into(),
                description: None,
                source: "Herald".into(),
                category: None,
                country: Some("ZW".into()),
                published_at: Some(chrono::Utc::now()),
            }])
            .await
            .unwrap();
        let vector = InMemoryVectorIndex::new();
        let llm = FakeLlmGateway::new(vec![]);

        let outcome = search(&doc_store, &edge_cache, &vector, &llm, "zimbabwe", &SearchOptions::default()).await;
        assert_eq!(outcome.method, SearchMethod::Keyword);
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn date_range_excludes_articles_outside_window() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        edge_cache
            .upsert_articles(vec![EdgeArticleRow {
                id: "1".into(),
                slug: "s".into(),
                title: "Zimbabwe economy grows".into(),
                description: None,
                source: "Herald".into(),
                category: None,
                country: Some("ZW".into()),
                published_at: Some(chrono::Utc::now() - chrono::Duration::days(30)),
            }])
            .await
            .unwrap();
        let vector = InMemoryVectorIndex::new();
        let llm = FakeLlmGateway::new(vec![]);

        let options = SearchOptions {
            date_from: Some(chrono::Utc::now() - chrono::Duration::days(1)),
            ..SearchOptions::default()
        };
        let outcome = search(&doc_store, &edge_cache, &vector, &llm, "zimbabwe", &options).await;
        assert!(outcome.results.is_empty());
    }
}
