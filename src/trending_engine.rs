//! Trending engine (§4.13): engagement-weighted topic aggregation over a rolling
//! 24h window, cached in the KV store. Named apart from `models::trending` (which
//! only holds the scope/topic/snapshot *shapes*) to keep the computation separate
//! from the data it produces. Grounded in `recommendation/engine.rs`'s own
//! aggregate-then-cache pattern, generalised from a single global scope to the
//! per-country scopes §4.13 requires.

use chrono::Utc;
use serde_json::json;

use crate::adapters::{DocStore, KvStore};
use crate::models::trending::{TrendingScope, TrendingSnapshot, TrendingTopic};

const TOP_N: usize = 20;
const TTL_SECS: u64 = 1_800;
const WINDOW_HOURS: i64 = 24;

/// §4.13. Recomputes every scope (`global` + the 6 priority countries) and writes
/// each snapshot into the KV store under its scope key.
pub async fn refresh_all_scopes(doc_store: &dyn DocStore, kv: &dyn KvStore) -> Vec<TrendingSnapshot> {
    let mut snapshots = Vec::new();
    snapshots.push(compute_and_cache(doc_store, kv, TrendingScope::Global).await);
    for country in TrendingScope::PRIORITY_COUNTRIES {
        snapshots.push(compute_and_cache(doc_store, kv, TrendingScope::Country(country)).await);
    }
    snapshots
}

async fn compute_and_cache(doc_store: &dyn DocStore, kv: &dyn KvStore, scope: TrendingScope) -> TrendingSnapshot {
    let snapshot = compute_snapshot(doc_store, scope).await;
    if let Ok(value) = serde_json::to_value(&snapshot) {
        kv.set(&scope.kv_key(), value, TTL_SECS).await;
    }
    snapshot
}

/// §4.13 read path: KV first, live computation on miss.
pub async fn get_snapshot(doc_store: &dyn DocStore, kv: &dyn KvStore, scope: TrendingScope) -> TrendingSnapshot {
    if let Some(cached) = kv.get(&scope.kv_key()).await {
        if let Ok(snapshot) = serde_json::from_value(cached) {
            return snapshot;
        }
    }
    compute_and_cache(doc_store, kv, scope).await
}

async fn compute_snapshot(doc_store: &dyn DocStore, scope: TrendingScope) -> TrendingSnapshot {
    let since = Utc::now() - chrono::Duration::hours(WINDOW_HOURS);

    let mut filter = json!({"published_at": {"$gte": since}});
    if let TrendingScope::Country(cc) = scope {
        filter["country_id"] = json!(cc);
    }

    let articles = doc_store.find("articles", filter, None, None).await.unwrap_or_default();
    let article_ids: Vec<String> = articles
        .iter()
        .filter_map(|a| a.get("id").and_then(|v| v.as_str()).map(String::from))
        .collect();

    let links = doc_store
        .find(
            "article_keyword_links",
            json!({"article_id": {"$in": article_ids}}),
            None,
            None,
        )
        .await
        .unwrap_or_default();

    let engagement_by_article: std::collections::HashMap<String, f64> = articles
        .iter()
        .filter_map(|a| {
            let id = a.get("id")?.as_str()?.to_string();
            let views = a.get("view_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let likes = a.get("like_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let bookmarks = a.get("bookmark_count").and_then(|v| v.as_f64()).unwrap_or(0.0);
            Some((id, views + 3.0 * likes + 2.0 * bookmarks))
        })
        .collect();

    struct Acc {
        keyword_name: String,
        article_count: i64,
        engagement_score: f64,
    }
    let mut by_keyword: std::collections::HashMap<String, Acc> = std::collections::HashMap::new();

    for link in &links {
        let Some(article_id) = link.get("article_id").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(keyword_id) = link.get("keyword_id").and_then(|v| v.as_str()) else {
            continue;
        };
        let engagement = engagement_by_article.get(article_id).copied().unwrap_or(0.0);
        let entry = by_keyword.entry(keyword_id.to_string()).or_insert(Acc {
            keyword_name: keyword_id.to_string(),
            article_count: 0,
            engagement_score: 0.0,
        });
        entry.article_count += 1;
        entry.engagement_score += engagement;
    }

    if !by_keyword.is_empty() {
        let keyword_ids: Vec<String> = by_keyword.keys().cloned().collect();
        let keyword_docs = doc_store
            .find("keywords", json!({"id": {"$in": keyword_ids}}), None, None)
            .await
            .unwrap_or_default();
        for doc in keyword_docs {
            if let (Some(id), Some(name)) = (
                doc.get("id").and_then(|v| v.as_str()),
                doc.get("name").and_then(|v| v.as_str()),
            ) {
                if let Some(entry) = by_keyword.get_mut(id) {
                    entry.keyword_name = name.to_string();
                }
            }
        }
    }

    let mut topics: Vec<TrendingTopic> = by_keyword
        .into_iter()
        .map(|(keyword_id, acc)| {
            let weighted_score = acc.article_count as f64 * (1.0 + (acc.engagement_score + 1.0).log10());
            TrendingTopic {
                keyword_id,
                keyword_name: acc.keyword_name,
                article_count: acc.article_count,
                engagement_score: acc.engagement_score,
                weighted_score,
            }
        })
        .collect();

    topics.sort_by(|a, b| b.weighted_score.partial_cmp(&a.weighted_score).unwrap_or(std::cmp::Ordering::Equal));
    topics.truncate(TOP_N);

    TrendingSnapshot {
        scope: scope.kv_key(),
        topics,
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::kv_store::InMemoryKvStore;

    #[tokio::test]
    async fn computes_and_caches_global_snapshot() {
        let doc_store = InMemoryDocStore::new();
        let kv = InMemoryKvStore::new();

        doc_store
            .insert_one(
                "articles",
                json!({"id": "a1", "view_count": 10, "like_count": 2, "bookmark_count": 1, "published_at": Utc::now()}),
            )
            .await
            .unwrap();
        doc_store
            .insert_one("article_keyword_links", json!({"article_id": "a1", "keyword_id": "k1"}))
            .await
            .unwrap();
        doc_store
            .insert_one("keywords", json!({"id": "k1", "name": "economy"}))
            .await
            .unwrap();

        let snapshot = compute_and_cache(&doc_store, &kv, TrendingScope::Global).await;
        assert_eq!(snapshot.topics.len(), 1);
        assert_eq!(snapshot.topics[0].keyword_name, "economy");

        let cached = kv.get("trending:global").await;
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn cache_hit_avoids_recompute_p9() {
        let doc_store = InMemoryDocStore::new();
        let kv = InMemoryKvStore::new();
        let first = compute_and_cache(&doc_store, &kv, TrendingScope::Global).await;
        let second = get_snapshot(&doc_store, &kv, TrendingScope::Global).await;
        assert_eq!(first.topics.len(), second.topics.len());
    }
}
