//! Feed collector (§4.7, "the workhorse"): adaptive, batched, deduplicating
//! ingestion. Phase structure (load & order → admit → batch-fetch → per-source
//! process → record health) and the per-source exception barrier are grounded in
//! `recommendation/crawler.rs`'s own `crawl_all_feeds` loop — same
//! batch-of-N-concurrent-fetches shape, same "one source's failure never aborts the
//! others" guarantee, generalised from that single crawler to this collector's five
//! phases.

use std::collections::HashSet;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;

use crate::adapters::{DocStore, EdgeCache, HttpFetcher, LlmGateway, VectorIndex};
use crate::enrichment::{enrich_article, EnrichmentInput};
use crate::feed::parser::{parse_feed, ParsedArticle, SourceMeta};
use crate::health::should_fetch;
use crate::keyword_extractor::load_dictionary;
use crate::models::article::Article;
use crate::models::source::{HealthStatus, Source};

const BATCH_SIZE: usize = 10;
const MAX_TOTAL_SUBREQUESTS: usize = 50;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceOutcome {
    pub source_id: String,
    pub inserted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CollectorSummary {
    pub sources_considered: usize,
    pub sources_admitted: usize,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub articles_inserted: usize,
    pub per_source: Vec<SourceOutcome>,
}

/// §4.7. Never throws: every per-source failure is caught and folded into the
/// summary, which is both the HTTP response body and the single `info` log line.
pub async fn run_collector(
    doc_store: &dyn DocStore,
    edge_cache: &dyn EdgeCache,
    http: &dyn HttpFetcher,
    llm: &dyn LlmGateway,
    vector: &dyn VectorIndex,
) -> CollectorSummary {
    let mut summary = CollectorSummary::default();

    let source_docs = match doc_store.find("rss_sources", json!({"enabled": true}), None, None).await {
        Ok(docs) => docs,
        Err(err) => {
            tracing::warn!(?err, "feed collector could not load sources");
            return summary;
        }
    };

    let mut sources: Vec<Source> = source_docs
        .into_iter()
        .filter_map(|d| serde_json::from_value(d).ok())
        .collect();
    summary.sources_considered = sources.len();

    // §4.7 phase 1: country priority asc, tie-break consecutive_failures asc.
    sources.sort_by(|a, b| {
        Source::country_priority(&a.country_id)
            .cmp(&Source::country_priority(&b.country_id))
            .then(a.consecutive_failures.cmp(&b.consecutive_failures))
    });

    let now = Utc::now();
    let admitted: Vec<Source> = sources
        .into_iter()
        .filter(|s| should_fetch(s, now))
        .take(MAX_TOTAL_SUBREQUESTS)
        .collect();
    summary.sources_admitted = admitted.len();

    let dictionary = load_dictionary(doc_store, edge_cache).await;

    for batch in admitted.chunks(BATCH_SIZE) {
        let results = join_all(
            batch
                .iter()
                .map(|source| process_source(doc_store, http, llm, vector, &dictionary, source)),
        )
        .await;

        for (source, result) in batch.iter().zip(results) {
            match result {
                Ok(inserted) => {
                    summary.sources_succeeded += 1;
                    summary.articles_inserted += inserted;
                    summary.per_source.push(SourceOutcome {
                        source_id: source.id.clone(),
                        inserted,
                        error: None,
                    });
                    record_success(doc_store, source).await;
                }
                Err(err) => {
                    summary.sources_failed += 1;
                    summary.per_source.push(SourceOutcome {
                        source_id: source.id.clone(),
                        inserted: 0,
                        error: Some(err.to_string()),
                    });
                    record_failure(doc_store, source, &err.to_string()).await;
                }
            }
        }
    }

    tracing::info!(
        considered = summary.sources_considered,
        admitted = summary.sources_admitted,
        succeeded = summary.sources_succeeded,
        failed = summary.sources_failed,
        inserted = summary.articles_inserted,
        "feed collector run complete"
    );

    summary
}

async fn process_source(
    doc_store: &dyn DocStore,
    http: &dyn HttpFetcher,
    llm: &dyn LlmGateway,
    vector: &dyn VectorIndex,
    dictionary: &[crate::models::Keyword],
    source: &Source,
) -> eyre::Result<usize> {
    let bytes = http.fetch_bytes(&source.feed_url).await?;

    let meta = SourceMeta {
        id: source.id.clone(),
        name: source.name.clone(),
        category_id: Some(source.category_id.clone()),
        country_id: Some(source.country_id.clone()),
    };
    let parsed = parse_feed(&bytes, &meta).map_err(|err| eyre::eyre!("{err}"))?;

    let fresh = dedup(doc_store, parsed.articles).await?;
    if fresh.is_empty() {
        return Ok(0);
    }

    let mut documents = Vec::with_capacity(fresh.len());
    for parsed_article in fresh {
        let article = build_article(doc_store, llm, vector, dictionary, parsed_article).await;
        documents.push(serde_json::to_value(&article)?);
    }

    let inserted = doc_store.insert_many("articles", documents).await?;
    Ok(inserted.len())
}

/// §4.7 I-Dedup: new iff no existing article shares a non-empty `rss_guid` AND none
/// shares `original_url`. Both checks are bulk `$in` lookups.
async fn dedup(doc_store: &dyn DocStore, articles: Vec<ParsedArticle>) -> eyre::Result<Vec<ParsedArticle>> {
    let guids: Vec<&str> = articles
        .iter()
        .map(|a| a.rss_guid.as_str())
        .filter(|g| !g.is_empty())
        .collect();
    let urls: Vec<&str> = articles.iter().map(|a| a.original_url.as_str()).collect();

    let existing_by_guid = doc_store
        .find("articles", json!({"rss_guid": {"$in": guids}}), Some(json!({"rss_guid": 1})), None)
        .await?;
    let existing_by_url = doc_store
        .find("articles", json!({"original_url": {"$in": urls}}), Some(json!({"original_url": 1})), None)
        .await?;

    let seen_guids: HashSet<String> = existing_by_guid
        .iter()
        .filter_map(|d| d.get("rss_guid").and_then(|v| v.as_str()).map(String::from))
        .collect();
    let seen_urls: HashSet<String> = existing_by_url
        .iter()
        .filter_map(|d| d.get("original_url").and_then(|v| v.as_str()).map(String::from))
        .collect();

    Ok(articles
        .into_iter()
        .filter(|a| {
            let guid_clash = !a.rss_guid.is_empty() && seen_guids.contains(&a.rss_guid);
            let url_clash = seen_urls.contains(&a.original_url);
            !guid_clash && !url_clash
        })
        .collect())
}

async fn build_article(
    doc_store: &dyn DocStore,
    llm: &dyn LlmGateway,
    vector: &dyn VectorIndex,
    dictionary: &[crate::models::Keyword],
    parsed: ParsedArticle,
) -> Article {
    let id = uuid::Uuid::new_v4().to_string();
    let input = EnrichmentInput {
        article_id: &id,
        original_url: &parsed.original_url,
        source_id: &parsed.source_id,
        title: &parsed.title,
        raw_html: &parsed.content,
        category_id: parsed.category_id.as_deref(),
        country_id: parsed.country_id.as_deref(),
    };
    let outcome = enrich_article(doc_store, llm, vector, dictionary, &input).await;

    let content = outcome.cleaned_content.clone().unwrap_or(parsed.content.clone());
    let now = Utc::now();

    Article {
        id,
        title: parsed.title,
        slug: parsed.slug,
        description: parsed.description,
        content,
        author: parsed.author,
        source: parsed.source,
        source_id: parsed.source_id,
        category_id: parsed.category_id,
        country_id: parsed.country_id,
        published_at: parsed.published_at,
        image_url: parsed.image_url,
        original_url: parsed.original_url,
        rss_guid: parsed.rss_guid,
        content_hash: outcome.content_hash.unwrap_or_default(),
        view_count: 0,
        like_count: 0,
        bookmark_count: 0,
        quality_score: outcome.quality.map(|q| q.quality_score),
        ai_processed: false,
        created_at: now,
        updated_at: now,
    }
}

async fn record_success(doc_store: &dyn DocStore, source: &Source) {
    let now = Utc::now();
    let update = json!({"$set": {
        "consecutive_failures": 0,
        "last_successful_fetch": now,
        "last_fetch_at": now,
        "health_status": HealthStatus::Healthy,
    }});
    if let Err(err) = doc_store.update_one("rss_sources", json!({"id": source.id}), update).await {
        tracing::warn!(source_id = %source.id, ?err, "failed to record source success");
    }
}

async fn record_failure(doc_store: &dyn DocStore, source: &Source, error: &str) {
    let now = Utc::now();
    let consecutive_failures = source.consecutive_failures + 1;
    let update = json!({"$set": {
        "consecutive_failures": consecutive_failures,
        "last_fetch_at": now,
        "last_error_at": now,
        "last_error": error,
        "health_status": HealthStatus::classify(consecutive_failures),
    }});
    tracing::warn!(source_id = %source.id, %error, "feed source fetch failed");
    if let Err(err) = doc_store.update_one("rss_sources", json!({"id": source.id}), update).await {
        tracing::warn!(source_id = %source.id, ?err, "failed to record source failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::edge_cache::InMemoryEdgeCache;
    use crate::adapters::http_fetcher::FakeHttpFetcher;
    use crate::adapters::llm_gateway::FakeLlmGateway;
    use crate::adapters::vector_index::InMemoryVectorIndex;

    const FEED_XML: &str = r#"<rss version="2.0"><channel><title>F</title>
        <item><title>Zimbabwe economy grows</title><link>https://example.com/a</link><guid>g1</guid></item>
    </channel></rss>"#;

    #[tokio::test]
    async fn collects_and_inserts_new_articles() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        doc_store
            .insert_one(
                "rss_sources",
                json!({
                    "id": "s1", "name": "Herald", "feed_url": "https://example.com/rss",
                    "country_id": "ZW", "category_id": "politics", "enabled": true,
                    "consecutive_failures": 0, "health_status": "healthy",
                    "source_quality_score": 0.5, "article_count_7d": 0
                }),
            )
            .await
            .unwrap();

        let http = FakeHttpFetcher::new().with_page("https://example.com/rss", FEED_XML);
        let llm = FakeLlmGateway::new(vec!["no json".into()]);
        let vector = InMemoryVectorIndex::new();

        let summary = run_collector(&doc_store, &edge_cache, &http, &llm, &vector).await;
        assert_eq!(summary.sources_succeeded, 1);
        assert_eq!(summary.articles_inserted, 1);

        let stored = doc_store.find("articles", json!({}), None, None).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn skips_already_seen_guid() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        doc_store
            .insert_one("articles", json!({"rss_guid": "g1", "original_url": "https://old"}))
            .await
            .unwrap();
        doc_store
            .insert_one(
                "rss_sources",
                json!({
                    "id": "s1", "name": "Herald", "feed_url": "https://example.com/rss",
                    "country_id": "ZW", "category_id": "politics", "enabled": true,
                    "consecutive_failures": 0, "health_status": "healthy",
                    "source_quality_score": 0.5, "article_count_7d": 0
                }),
            )
            .await
            .unwrap();

        let http = FakeHttpFetcher::new().with_page("https://example.com/rss", FEED_XML);
        let llm = FakeLlmGateway::new(vec!["no json".into()]);
        let vector = InMemoryVectorIndex::new();

        let summary = run_collector(&doc_store, &edge_cache, &http, &llm, &vector).await;
        assert_eq!(summary.articles_inserted, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_isolated_and_recorded() {
        let doc_store = InMemoryDocStore::new();
        let edge_cache = InMemoryEdgeCache::new();
        doc_store
            .insert_one(
                "rss_sources",
                json!({
                    "id": "s1", "name": "Herald", "feed_url": "https://example.com/missing",
                    "country_id": "ZW", "category_id": "politics", "enabled": true,
                    "consecutive_failures": 0, "health_status": "healthy",
                    "source_quality_score": 0.5, "article_count_7d": 0
                }),
            )
            .await
            .unwrap();

        let http = FakeHttpFetcher::new();
        let llm = FakeLlmGateway::new(vec![]);
        let vector = InMemoryVectorIndex::new();

        let summary = run_collector(&doc_store, &edge_cache, &http, &llm, &vector).await;
        assert_eq!(summary.sources_failed, 1);

        let source = doc_store
            .find_one("rss_sources", json!({"id": "s1"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source["consecutive_failures"], 1);
    }
}
