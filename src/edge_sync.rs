//! Edge-cache synchroniser (§4.9): replicates recent primary-store deltas into the
//! read-optimised edge cache on an hourly cadence. Grounded in the same
//! primary-to-replica sync shape in `recommendation/engine.rs` (periodic bulk
//! upsert with a bounded window and a per-row failure count rather than an
//! all-or-nothing transaction).

use chrono::Utc;
use serde_json::json;

use crate::adapters::edge_cache::{EdgeArticleRow, EdgeCategoryRow, EdgeKeywordRow};
use crate::adapters::{DocStore, EdgeCache};
use crate::models::{Article, Category, Keyword};

const SYNC_WINDOW_HOURS: i64 = 2;
const MAX_ARTICLES_PER_RUN: i64 = 200;
const MAX_KEYWORDS_PER_RUN: i64 = 500;
const MAX_CATEGORIES: i64 = 50;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncSummary {
    pub articles_written: u64,
    pub keywords_written: u64,
    pub categories_written: u64,
    pub errors: u64,
}

/// §4.9. The 2-hour window against an hourly cadence deliberately overlaps the
/// previous run so no article is ever missed between syncs.
pub async fn sync_edge_cache(doc_store: &dyn DocStore, edge_cache: &dyn EdgeCache) -> eyre::Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    let since = Utc::now() - chrono::Duration::hours(SYNC_WINDOW_HOURS);

    let article_docs = doc_store
        .find(
            "articles",
            json!({"$or": [{"created_at": {"$gte": since}}, {"updated_at": {"$gte": since}}]}),
            None,
            Some(MAX_ARTICLES_PER_RUN),
        )
        .await?;
    let articles: Vec<Article> = article_docs.into_iter().filter_map(|d| serde_json::from_value(d).ok()).collect();
    let article_rows: Vec<EdgeArticleRow> = articles.iter().map(EdgeArticleRow::from).collect();
    let article_counts = edge_cache.upsert_articles(article_rows).await?;
    summary.articles_written = article_counts.written;
    summary.errors += article_counts.errors;

    let keyword_docs = doc_store
        .aggregate(
            "keywords",
            vec![json!({"$sort": {"usage_count": -1}}), json!({"$limit": MAX_KEYWORDS_PER_RUN})],
        )
        .await
        .unwrap_or_default();
    let keyword_docs = if keyword_docs.is_empty() {
        doc_store.find("keywords", json!({}), None, Some(MAX_KEYWORDS_PER_RUN)).await?
    } else {
        keyword_docs
    };
    let keywords: Vec<Keyword> = keyword_docs.into_iter().filter_map(|d| serde_json::from_value(d).ok()).collect();
    let keyword_rows: Vec<EdgeKeywordRow> = keywords.iter().map(EdgeKeywordRow::from).collect();
    let keyword_counts = edge_cache.upsert_keywords(keyword_rows).await?;
    summary.keywords_written = keyword_counts.written;
    summary.errors += keyword_counts.errors;

    let category_docs = doc_store.find("categories", json!({}), None, Some(MAX_CATEGORIES)).await?;
    let categories: Vec<Category> = category_docs.into_iter().filter_map(|d| serde_json::from_value(d).ok()).collect();
    let category_rows: Vec<EdgeCategoryRow> = categories.iter().map(EdgeCategoryRow::from).collect();
    let category_counts = edge_cache.upsert_categories(category_rows).await?;
    summary.categories_written = category_counts.written;
    summary.errors += category_counts.errors;

    tracing::info!(
        articles = summary.articles_written,
        keywords = summary.keywords_written,
        categories = summary.categories_written,
        errors = summary.errors,
        "edge cache sync complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::edge_cache::InMemoryEdgeCache;

    #[tokio::test]
    async fn replicates_recent_articles_and_all_categories() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();

        doc_store
            .insert_one(
                "articles",
                json!({
                    "id": "a1", "title": "T", "slug": "t", "content": "c",
                    "source": "Herald", "source_id": "s1", "original_url": "https://a",
                    "rss_guid": "g1", "content_hash": "abc", "ai_processed": false,
                    "created_at": Utc::now(), "updated_at": Utc::now()
                }),
            )
            .await
            .unwrap();
        doc_store
            .insert_one("categories", json!({"id": "c1", "name": "Politics", "enabled": true}))
            .await
            .unwrap();

        let summary = sync_edge_cache(&doc_store, &edge_cache).await.unwrap();
        assert_eq!(summary.articles_written, 1);
        assert_eq!(summary.categories_written, 1);
    }
}
