//! HTTP surface (§6): one handler per documented path, all closing over `App` via
//! axum's `State` extractor. Grounded in the same `Router::new().route(...)`
//! composition used in `main.rs`, generalised from two routes to the full table here, and
//! using the crate's own request `json::Json` extractor / `error::AppError` instead
//! of axum's defaults for the reasons recorded in `error.rs`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json as Res, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::App;
use crate::error::AppError;
use crate::json::Json as Req;
use crate::models::trending::TrendingScope;

pub fn router(app: App) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rss/parse", post(rss_parse))
        .route("/content/clean", post(content_clean))
        .route("/content/scrape", post(content_scrape))
        .route("/content/process", post(content_process))
        .route("/keywords/extract", post(keywords_extract))
        .route("/quality/score", post(quality_score))
        .route("/clustering/cluster", post(clustering_cluster))
        .route("/search/query", post(search_query))
        .route("/search/trending", get(search_trending))
        .route("/feed/rank", post(feed_rank))
        .route("/feed/collect", post(feed_collect))
        .route("/trending", get(trending_global))
        .route("/trending/{cc}", get(trending_country))
        .route("/sources/health", post(sources_health))
        .with_state(Arc::new(app))
}

type S = State<Arc<App>>;

async fn health() -> Res<Value> {
    Res(json!({"status": "ok"}))
}

#[derive(Deserialize)]
struct RssParseRequest {
    xml: String,
    source_id: String,
    source_name: String,
    category_id: Option<String>,
    country_id: Option<String>,
}

async fn rss_parse(Req(req): Req<RssParseRequest>) -> Result<Res<Value>, AppError> {
    let meta = crate::feed::parser::SourceMeta {
        id: req.source_id,
        name: req.source_name,
        category_id: req.category_id,
        country_id: req.country_id,
    };
    let parsed = crate::feed::parser::parse_feed(req.xml.as_bytes(), &meta)
        .map_err(|err| AppError::Invalid(err.to_string()))?;
    Ok(Res(json!({
        "feed_title": parsed.feed_title,
        "item_count": parsed.item_count,
        "articles": parsed.articles.iter().map(|a| json!({
            "title": a.title,
            "slug": a.slug,
            "description": a.description,
            "author": a.author,
            "image_url": a.image_url,
            "original_url": a.original_url,
            "rss_guid": a.rss_guid,
            "published_at": a.published_at,
        })).collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
struct CleanRequest {
    html: String,
}

async fn content_clean(Req(req): Req<CleanRequest>) -> Res<Value> {
    let result = crate::html_cleaner::clean_html(&req.html, &crate::html_cleaner::CleanOptions::default());
    Res(json!({
        "cleaned_content": result.cleaned_content,
        "extracted_images": result.extracted_images,
        "removed_char_count": result.removed_char_count,
    }))
}

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
}

async fn content_scrape(State(app): S, Req(req): Req<ScrapeRequest>) -> Result<Res<Value>, AppError> {
    let html = app.http.fetch_html(&req.url).await.map_err(|err| AppError::Upstream(err.to_string()))?;
    let article = crate::article_extractor::extract_article(&html, &req.url);
    Ok(Res(json!({
        "title": article.title,
        "content": article.content,
        "image_url": article.image_url,
        "author": article.author,
        "word_count": article.word_count,
        "reading_time_minutes": article.reading_time_minutes,
    })))
}

#[derive(Deserialize)]
struct ProcessRequest {
    title: String,
    html: String,
    category_id: Option<String>,
    country_id: Option<String>,
}

async fn content_process(State(app): S, Req(req): Req<ProcessRequest>) -> Result<Res<Value>, AppError> {
    let dictionary = crate::keyword_extractor::load_dictionary(app.doc_store.as_ref(), app.edge_cache.as_ref()).await;
    let input = crate::enrichment::EnrichmentInput {
        article_id: "preview",
        original_url: "",
        source_id: "",
        title: &req.title,
        raw_html: &req.html,
        category_id: req.category_id.as_deref(),
        country_id: req.country_id.as_deref(),
    };
    let outcome =
        crate::enrichment::enrich_article(app.doc_store.as_ref(), app.llm.as_ref(), app.vector.as_ref(), &dictionary, &input).await;
    Ok(Res(serde_json::to_value(&outcome)?))
}

#[derive(Deserialize)]
struct KeywordsRequest {
    title: String,
    content: String,
    category_id: Option<String>,
    country_id: Option<String>,
}

async fn keywords_extract(State(app): S, Req(req): Req<KeywordsRequest>) -> Res<Value> {
    let dictionary = crate::keyword_extractor::load_dictionary(app.doc_store.as_ref(), app.edge_cache.as_ref()).await;
    let keywords = crate::keyword_extractor::extract_keywords(
        app.doc_store.as_ref(),
        app.llm.as_ref(),
        &dictionary,
        &req.title,
        &req.content,
        req.category_id.as_deref(),
        req.country_id.as_deref(),
    )
    .await;
    Res(json!({"keywords": keywords}))
}

#[derive(Deserialize)]
struct QualityRequest {
    title: String,
    content: String,
}

async fn quality_score(Req(req): Req<QualityRequest>) -> Res<Value> {
    let result = crate::quality_scorer::score_quality(&req.title, &req.content);
    Res(serde_json::to_value(result).unwrap_or(json!({})))
}

#[derive(Deserialize)]
struct ClusterRequest {
    articles: Vec<crate::cluster::ClusterInput>,
    similarity_threshold: Option<f32>,
    max_related: Option<usize>,
    max_clusters: Option<usize>,
}

async fn clustering_cluster(State(app): S, Req(req): Req<ClusterRequest>) -> Res<Value> {
    let config = crate::cluster::ClusterConfig {
        similarity_threshold: req.similarity_threshold,
        max_related: req.max_related,
        max_clusters: req.max_clusters,
    };
    let result = crate::cluster::cluster_articles(app.vector.as_ref(), &req.articles, &config).await;
    Res(serde_json::to_value(result).unwrap_or(json!({})))
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    category: Option<String>,
    source: Option<String>,
    date_from: Option<chrono::DateTime<chrono::Utc>>,
    date_to: Option<chrono::DateTime<chrono::Utc>>,
    limit: Option<i64>,
    #[serde(default)]
    want_insights: bool,
}

async fn search_query(State(app): S, Req(req): Req<SearchRequest>) -> Res<Value> {
    let options = crate::search::SearchOptions {
        category: req.category,
        source: req.source,
        date_from: req.date_from,
        date_to: req.date_to,
        limit: req.limit,
        want_insights: req.want_insights,
    };
    let outcome = crate::search::search(
        app.doc_store.as_ref(),
        app.edge_cache.as_ref(),
        app.vector.as_ref(),
        app.llm.as_ref(),
        &req.query,
        &options,
    )
    .await;
    Res(serde_json::to_value(outcome).unwrap_or(json!({})))
}

async fn search_trending(State(app): S) -> Res<Value> {
    let snapshot = crate::trending_engine::get_snapshot(app.doc_store.as_ref(), app.kv.as_ref(), TrendingScope::Global).await;
    Res(serde_json::to_value(snapshot).unwrap_or(json!({})))
}

#[derive(Deserialize)]
struct RankRequest {
    articles: Vec<crate::ranker::RankableArticle>,
    preferences: crate::ranker::Preferences,
}

async fn feed_rank(Req(req): Req<RankRequest>) -> Res<Value> {
    let ranked = crate::ranker::rank_articles(&req.articles, &req.preferences, chrono::Utc::now());
    Res(json!({"ranked": ranked}))
}

async fn feed_collect(State(app): S) -> Res<Value> {
    let summary = crate::feed::collector::run_collector(
        app.doc_store.as_ref(),
        app.edge_cache.as_ref(),
        app.http.as_ref(),
        app.llm.as_ref(),
        app.vector.as_ref(),
    )
    .await;
    Res(serde_json::to_value(summary).unwrap_or(json!({})))
}

async fn trending_global(State(app): S) -> Res<Value> {
    let snapshot = crate::trending_engine::get_snapshot(app.doc_store.as_ref(), app.kv.as_ref(), TrendingScope::Global).await;
    Res(serde_json::to_value(snapshot).unwrap_or(json!({})))
}

async fn trending_country(State(app): S, Path(cc): Path<String>) -> Result<Res<Value>, AppError> {
    let country = TrendingScope::PRIORITY_COUNTRIES
        .iter()
        .find(|code| code.eq_ignore_ascii_case(&cc))
        .ok_or_else(|| AppError::Invalid(format!("unsupported trending country code: {cc}")))?;
    let snapshot = crate::trending_engine::get_snapshot(app.doc_store.as_ref(), app.kv.as_ref(), TrendingScope::Country(country)).await;
    Ok(Res(serde_json::to_value(snapshot).unwrap_or(json!({}))))
}

#[derive(Deserialize)]
struct SourcesHealthQuery {
    #[serde(default)]
    audit: bool,
}

async fn sources_health(State(app): S, Query(q): Query<SourcesHealthQuery>) -> Result<Res<Value>, AppError> {
    if q.audit {
        let summary = crate::health::audit_sources(app.doc_store.as_ref()).await?;
        return Ok(Res(serde_json::to_value(summary)?));
    }
    let docs = app.doc_store.find("rss_sources", json!({}), None, None).await?;
    Ok(Res(json!({"sources": docs})))
}
