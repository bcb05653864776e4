//! Analytics (§4.14): enhanced stats, trending-category growth, and content
//! insights computed over the primary document store. Grounded in
//! `recommendation/engine.rs`'s own aggregate-and-shape-for-display pass,
//! generalised from a single collection scan to the counts table this needs.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::adapters::DocStore;
use crate::models::category;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsSummary {
    pub total_articles: i64,
    pub active_sources: i64,
    pub categories: i64,
    pub articles_last_24h: i64,
    pub articles_last_7d: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryGrowth {
    pub category_id: String,
    pub display_name: String,
    pub today_count: i64,
    pub yesterday_count: i64,
    pub growth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopArticle {
    pub id: String,
    pub title: String,
    pub engagement: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceProductivity {
    pub source_id: String,
    pub article_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentInsights {
    pub top_articles: Vec<TopArticle>,
    pub source_productivity: Vec<SourceProductivity>,
}

/// §4.14: headline counts across articles, sources, and categories.
pub async fn enhanced_stats(doc_store: &dyn DocStore) -> eyre::Result<StatsSummary> {
    let now = Utc::now();
    let day_ago = now - Duration::hours(24);
    let week_ago = now - Duration::days(7);

    Ok(StatsSummary {
        total_articles: doc_store.count("articles", json!({})).await?,
        active_sources: doc_store.count("rss_sources", json!({"enabled": true})).await?,
        categories: doc_store.count("categories", json!({"enabled": true})).await?,
        articles_last_24h: doc_store.count("articles", json!({"published_at": {"$gte": day_ago}})).await?,
        articles_last_7d: doc_store.count("articles", json!({"published_at": {"$gte": week_ago}})).await?,
    })
}

/// §4.14: per-category article counts for today vs. yesterday, with growth
/// `(today - yesterday) / max(yesterday, 1)`.
pub async fn trending_categories(doc_store: &dyn DocStore) -> eyre::Result<Vec<CategoryGrowth>> {
    let now = Utc::now();
    let today_start = now - Duration::hours(24);
    let yesterday_start = now - Duration::hours(48);

    let categories = doc_store.find("categories", json!({"enabled": true}), None, None).await?;
    let mut growth = Vec::with_capacity(categories.len());

    for cat in categories {
        let Some(category_id) = cat.get("id").and_then(|v| v.as_str()) else {
            continue;
        };
        let today_count = doc_store
            .count(
                "articles",
                json!({"category_id": category_id, "published_at": {"$gte": today_start}}),
            )
            .await?;
        let yesterday_count = doc_store
            .count(
                "articles",
                json!({"category_id": category_id, "published_at": {"$gte": yesterday_start, "$lt": today_start}}),
            )
            .await?;
        let delta = (today_count - yesterday_count) as f64 / yesterday_count.max(1) as f64;
        growth.push(CategoryGrowth {
            category_id: category_id.to_string(),
            display_name: category::display_name(category_id),
            today_count,
            yesterday_count,
            growth: round2(delta),
        });
    }

    growth.sort_by(|a, b| b.growth.partial_cmp(&a.growth).unwrap_or(std::cmp::Ordering::Equal));
    Ok(growth)
}

/// §4.14: top articles by engagement and per-source article counts, both over
/// the last 7 days.
pub async fn content_insights(doc_store: &dyn DocStore) -> eyre::Result<ContentInsights> {
    let week_ago = Utc::now() - Duration::days(7);
    let articles = doc_store
        .find("articles", json!({"published_at": {"$gte": week_ago}}), None, None)
        .await?;

    let mut top_articles: Vec<TopArticle> = articles
        .iter()
        .filter_map(|a| {
            let id = a.get("id")?.as_str()?.to_string();
            let title = a.get("title")?.as_str()?.to_string();
            let views = a.get("view_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let likes = a.get("like_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let bookmarks = a.get("bookmark_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let engagement = views + 3.0 * likes + 2.0 * bookmarks;
            Some(TopArticle { id, title, engagement })
        })
        .collect();
    top_articles.sort_by(|a, b| b.engagement.partial_cmp(&a.engagement).unwrap_or(std::cmp::Ordering::Equal));
    top_articles.truncate(10);

    let mut counts: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    for article in &articles {
        if let Some(source_id) = article.get("source_id").and_then(|v| v.as_str()) {
            *counts.entry(source_id.to_string()).or_insert(0) += 1;
        }
    }
    let mut source_productivity: Vec<SourceProductivity> = counts
        .into_iter()
        .map(|(source_id, article_count)| SourceProductivity { source_id, article_count })
        .collect();
    source_productivity.sort_by(|a, b| b.article_count.cmp(&a.article_count));

    Ok(ContentInsights { top_articles, source_productivity })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;

    #[tokio::test]
    async fn enhanced_stats_counts_enabled_sources_and_categories() {
        let doc_store = InMemoryDocStore::new();
        doc_store.insert_one("rss_sources", json!({"id": "s1", "enabled": true})).await.unwrap();
        doc_store.insert_one("rss_sources", json!({"id": "s2", "enabled": false})).await.unwrap();
        doc_store.insert_one("categories", json!({"id": "politics", "enabled": true})).await.unwrap();
        doc_store
            .insert_one("articles", json!({"id": "a1", "published_at": Utc::now()}))
            .await
            .unwrap();

        let stats = enhanced_stats(&doc_store).await.unwrap();
        assert_eq!(stats.total_articles, 1);
        assert_eq!(stats.active_sources, 1);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.articles_last_24h, 1);
    }

    #[tokio::test]
    async fn content_insights_ranks_by_engagement() {
        let doc_store = InMemoryDocStore::new();
        doc_store
            .insert_one(
                "articles",
                json!({"id": "low", "title": "Low", "source_id": "s1", "view_count": 1, "published_at": Utc::now()}),
            )
            .await
            .unwrap();
        doc_store
            .insert_one(
                "articles",
                json!({"id": "high", "title": "High", "source_id": "s1", "view_count": 100, "like_count": 10, "published_at": Utc::now()}),
            )
            .await
            .unwrap();

        let insights = content_insights(&doc_store).await.unwrap();
        assert_eq!(insights.top_articles[0].id, "high");
        assert_eq!(insights.source_productivity[0].article_count, 2);
    }
}
