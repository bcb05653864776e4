//! Enrichment pipeline (§4.6): composes the cleaner, keyword extractor, quality
//! scorer and vector adapter into one per-article pass. Each step is wrapped so a
//! failure is logged and skipped rather than unwinding the rest — a saga over
//! independently-failable stages, the same shape used by the
//! `recommendation/crawler.rs` per-source try/log/continue loop applied one level
//! deeper, to steps instead of sources.

use std::time::Instant;

use crate::adapters::{DocStore, LlmGateway, VectorIndex};
use crate::html_cleaner::{clean_html, CleanOptions};
use crate::keyword_extractor::{extract_keywords, ExtractedKeyword};
use crate::models::Article;
use crate::quality_scorer::{score_quality, QualityResult};

const MIN_CONTENT_FOR_EMBEDDING: usize = 50;
const EMBEDDING_EXCERPT_LEN: usize = 500;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EnrichmentOutcome {
    pub cleaned_content: Option<String>,
    pub extracted_images: Vec<String>,
    pub keywords: Vec<SerializableKeyword>,
    pub quality: Option<QualityResult>,
    pub content_hash: Option<String>,
    pub embedding_id: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SerializableKeyword {
    pub keyword: String,
    pub confidence: f64,
    pub category: Option<String>,
}

impl From<ExtractedKeyword> for SerializableKeyword {
    fn from(k: ExtractedKeyword) -> Self {
        SerializableKeyword {
            keyword: k.keyword,
            confidence: k.confidence,
            category: k.category,
        }
    }
}

pub struct EnrichmentInput<'a> {
    pub article_id: &'a str,
    pub original_url: &'a str,
    pub source_id: &'a str,
    pub title: &'a str,
    pub raw_html: &'a str,
    pub category_id: Option<&'a str>,
    pub country_id: Option<&'a str>,
}

/// §4.6. Never fails: partial step failures just omit that field and are logged.
pub async fn enrich_article(
    doc_store: &dyn DocStore,
    llm: &dyn LlmGateway,
    vector: &dyn VectorIndex,
    dictionary: &[crate::models::Keyword],
    input: &EnrichmentInput<'_>,
) -> EnrichmentOutcome {
    let start = Instant::now();
    let mut outcome = EnrichmentOutcome::default();

    let cleaned = clean_html(input.raw_html, &CleanOptions::default());
    outcome.extracted_images = cleaned.extracted_images;
    outcome.cleaned_content = Some(cleaned.cleaned_content.clone());

    let keywords = extract_keywords(
        doc_store,
        llm,
        dictionary,
        input.title,
        &cleaned.cleaned_content,
        input.category_id,
        input.country_id,
    )
    .await;
    outcome.keywords = keywords.into_iter().map(SerializableKeyword::from).collect();

    outcome.quality = Some(score_quality(input.title, &cleaned.cleaned_content));
    outcome.content_hash = Some(Article::content_hash(input.title, &cleaned.cleaned_content));

    if cleaned.cleaned_content.len() >= MIN_CONTENT_FOR_EMBEDDING {
        let excerpt: String = cleaned.cleaned_content.chars().take(EMBEDDING_EXCERPT_LEN).collect();
        match vector.embed(input.title, &excerpt).await {
            Ok(embedding) => {
                let embedding_id = format!("article_{}", input.article_id);
                // Best-effort: the logical embedding_id is recorded regardless of
                // whether the upsert itself lands.
                if let Err(err) = vector.upsert(&embedding_id, embedding).await {
                    tracing::warn!(
                        original_url = %input.original_url,
                        source_id = %input.source_id,
                        ?err,
                        "embedding upsert failed"
                    );
                }
                outcome.embedding_id = Some(embedding_id);
            }
            Err(err) => {
                tracing::warn!(
                    original_url = %input.original_url,
                    source_id = %input.source_id,
                    ?err,
                    "embedding generation failed"
                );
            }
        }
    }

    outcome.elapsed_ms = start.elapsed().as_millis() as u64;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::llm_gateway::FakeLlmGateway;
    use crate::adapters::vector_index::InMemoryVectorIndex;

    #[tokio::test]
    async fn enriches_all_fields_for_sufficiently_long_content() {
        let doc_store = InMemoryDocStore::new();
        let llm = FakeLlmGateway::new(vec!["no json".into()]);
        let vector = InMemoryVectorIndex::new();
        let html = format!("<p>{}</p>", "Zimbabwe news content with real detail. ".repeat(10));
        let input = EnrichmentInput {
            article_id: "a1",
            original_url: "https://example.com/a",
            source_id: "s1",
            title: "Zimbabwe economy grows",
            raw_html: &html,
            category_id: Some("business"),
            country_id: Some("ZW"),
        };
        let outcome = enrich_article(&doc_store, &llm, &vector, &[], &input).await;
        assert!(outcome.cleaned_content.is_some());
        assert!(outcome.quality.is_some());
        assert!(outcome.content_hash.is_some());
        assert_eq!(outcome.embedding_id.as_deref(), Some("article_a1"));
    }

    #[tokio::test]
    async fn skips_embedding_for_short_content() {
        let doc_store = InMemoryDocStore::new();
        let llm = FakeLlmGateway::new(vec!["no json".into()]);
        let vector = InMemoryVectorIndex::new();
        let input = EnrichmentInput {
            article_id: "a2",
            original_url: "https://example.com/b",
            source_id: "s1",
            title: "Short",
            raw_html: "<p>tiny</p>",
            category_id: None,
            country_id: None,
        };
        let outcome = enrich_article(&doc_store, &llm, &vector, &[], &input).await;
        assert!(outcome.embedding_id.is_none());
    }
}
