//! Keyword extractor (§4.4): LLM-first, dictionary-substring fallback. Prompt
//! construction and the tolerant-JSON contract mirror `llm_gateway`'s own extraction
//! cascade; dictionary loading follows the doc-store-then-edge-cache fallback order
//! the same "primary, degrade to replica" read order used in
//! `recommendation/engine.rs`.

use std::collections::HashMap;

use serde_json::json;

use crate::adapters::{DocStore, EdgeCache, LlmGateway};
use crate::models::Keyword;

const MAX_DICTIONARY_SIZE: i64 = 200;
const MAX_KEYWORDS: usize = 8;
const FALLBACK_CANDIDATE_POOL: usize = 20;
const FALLBACK_CONFIDENCE: f64 = 0.7;
const MIN_LLM_CONFIDENCE: f64 = 0.5;
const USAGE_INCREMENT: i64 = 1;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractedKeyword {
    pub keyword: String,
    pub confidence: f64,
    pub category: Option<String>,
}

fn language_hint(country_id: &str) -> Option<&'static str> {
    match country_id {
        "ZW" => Some("Shona/Ndebele"),
        "KE" | "TZ" => Some("Swahili"),
        "MZ" => Some("Portuguese"),
        "EG" | "MA" => Some("Arabic/French"),
        "GH" => Some("Twi/Akan"),
        "RW" => Some("Kinyarwanda/French"),
        "ET" => Some("Amharic"),
        _ => None,
    }
}

/// Loads up to 200 enabled keywords from the primary store, falling back to the
/// edge cache's replicated dictionary when the doc-store call fails.
pub async fn load_dictionary(doc_store: &dyn DocStore, edge_cache: &dyn EdgeCache) -> Vec<Keyword> {
    let primary = doc_store
        .find(
            "keywords",
            json!({"enabled": true}),
            None,
            Some(MAX_DICTIONARY_SIZE),
        )
        .await;

    match primary {
        Ok(docs) if !docs.is_empty() => docs
            .into_iter()
            .filter_map(|d| serde_json::from_value(d).ok())
            .collect(),
        _ => edge_cache
            .top_keywords(MAX_DICTIONARY_SIZE)
            .await
            .map(|rows| {
                rows.into_iter()
                    .map(|row| Keyword {
                        id: row.id,
                        name: row.name,
                        category_id: row.category_id,
                        relevance_score: 0.5,
                        usage_count: row.usage_count,
                        enabled: true,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// §4.4. `dictionary` should already be loaded (typically once per enrichment batch,
/// not once per article). Fails soft: always returns `Ok` with possibly-empty results.
/// On success, increments `usage_count` for every keyword selected.
pub async fn extract_keywords(
    doc_store: &dyn DocStore,
    llm: &dyn LlmGateway,
    dictionary: &[Keyword],
    title: &str,
    content: &str,
    category_id: Option<&str>,
    country_id: Option<&str>,
) -> Vec<ExtractedKeyword> {
    let found = if let Some(found) = extract_via_llm(llm, dictionary, title, content, category_id, country_id).await {
        if !found.is_empty() {
            found
        } else {
            extract_via_dictionary_match(dictionary, title, content)
        }
    } else {
        extract_via_dictionary_match(dictionary, title, content)
    };

    record_usage(doc_store, &found).await;
    found
}

/// Best-effort: a failed increment is logged and otherwise doesn't affect extraction.
async fn record_usage(doc_store: &dyn DocStore, keywords: &[ExtractedKeyword]) {
    for keyword in keywords {
        let filter = json!({"name": keyword.keyword});
        let update = json!({"$inc": {"usage_count": USAGE_INCREMENT}});
        if let Err(err) = doc_store.update_one("keywords", filter, update).await {
            tracing::warn!(keyword = %keyword.keyword, ?err, "failed to increment keyword usage_count");
        }
    }
}

async fn extract_via_llm(
    llm: &dyn LlmGateway,
    dictionary: &[Keyword],
    title: &str,
    content: &str,
    category_id: Option<&str>,
    country_id: Option<&str>,
) -> Option<Vec<ExtractedKeyword>> {
    let by_lower: HashMap<String, &Keyword> =
        dictionary.iter().map(|k| (k.name.to_lowercase(), k)).collect();

    let dictionary_names: Vec<&str> = dictionary.iter().map(|k| k.name.as_str()).collect();
    let language_hint = country_id.and_then(language_hint);

    let mut prompt = String::new();
    prompt.push_str("Extract up to 8 relevant keywords for this news article, choosing ONLY from the provided dictionary. Respond with JSON only: {\"keywords\": [{\"keyword\": \"...\", \"confidence\": 0.0-1.0}]}.\n\n");
    prompt.push_str(&format!("Title: {title}\n"));
    prompt.push_str(&format!("Content: {}\n", content.chars().take(2000).collect::<String>()));
    if let Some(category_id) = category_id {
        prompt.push_str(&format!("Category: {category_id}\n"));
    }
    if let Some(country_id) = country_id {
        prompt.push_str(&format!("Country: {country_id}\n"));
    }
    if let Some(hint) = language_hint {
        prompt.push_str(&format!("Local language hint: {hint}\n"));
    }
    prompt.push_str(&format!("Dictionary: {}\n", dictionary_names.join(", ")));

    let response = llm.complete_json(&prompt).await.ok()??;
    let items = response.get("keywords")?.as_array()?;

    let mut results = Vec::new();
    for item in items {
        let Some(keyword) = item.get("keyword").and_then(|v| v.as_str()) else {
            continue;
        };
        let confidence = item.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if confidence <= MIN_LLM_CONFIDENCE {
            continue;
        }
        if let Some(dict_entry) = by_lower.get(&keyword.to_lowercase()) {
            results.push(ExtractedKeyword {
                keyword: dict_entry.name.clone(),
                confidence,
                category: dict_entry.category_id.clone(),
            });
        }
        if results.len() >= MAX_KEYWORDS {
            break;
        }
    }
    Some(results)
}

fn extract_via_dictionary_match(dictionary: &[Keyword], title: &str, content: &str) -> Vec<ExtractedKeyword> {
    let haystack = format!("{title} {content}").to_lowercase();

    let mut ordered: Vec<&Keyword> = dictionary.iter().collect();
    ordered.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then(b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut results = Vec::new();
    for keyword in ordered.into_iter().take(FALLBACK_CANDIDATE_POOL) {
        if haystack.contains(&keyword.name.to_lowercase()) {
            results.push(ExtractedKeyword {
                keyword: keyword.name.clone(),
                confidence: FALLBACK_CONFIDENCE,
                category: keyword.category_id.clone(),
            });
        }
        if results.len() >= MAX_KEYWORDS {
            break;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::doc_store::InMemoryDocStore;
    use crate::adapters::llm_gateway::FakeLlmGateway;

    fn dictionary() -> Vec<Keyword> {
        vec![
            Keyword {
                id: "1".into(),
                name: "economy".into(),
                category_id: Some("business".into()),
                relevance_score: 0.9,
                usage_count: 50,
                enabled: true,
            },
            Keyword {
                id: "2".into(),
                name: "elections".into(),
                category_id: Some("politics".into()),
                relevance_score: 0.8,
                usage_count: 10,
                enabled: true,
            },
        ]
    }

    #[tokio::test]
    async fn falls_back_to_dictionary_match_when_llm_yields_nothing() {
        let doc_store = InMemoryDocStore::new();
        let llm = FakeLlmGateway::new(vec!["no json here".into()]);
        let found = extract_keywords(
            &doc_store,
            &llm,
            &dictionary(),
            "Zimbabwe economy grows",
            "The economy expanded this quarter.",
            None,
            Some("ZW"),
        )
        .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].keyword, "economy");
        assert_eq!(found[0].confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn llm_results_are_filtered_against_dictionary() {
        let doc_store = InMemoryDocStore::new();
        let llm = FakeLlmGateway::new(vec![
            r#"{"keywords": [{"keyword": "economy", "confidence": 0.9}, {"keyword": "not-in-dict", "confidence": 0.9}]}"#.into(),
        ]);
        let found = extract_keywords(&doc_store, &llm, &dictionary(), "T", "C", None, None).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].keyword, "economy");
    }

    #[tokio::test]
    async fn low_confidence_llm_keywords_are_dropped() {
        let doc_store = InMemoryDocStore::new();
        let llm = FakeLlmGateway::new(vec![
            r#"{"keywords": [{"keyword": "economy", "confidence": 0.2}]}"#.into(),
        ]);
        let found = extract_keywords(&doc_store, &llm, &dictionary(), "T", "C", None, None).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn successful_extraction_increments_usage_count() {
        let doc_store = InMemoryDocStore::new();
        doc_store
            .insert_one("keywords", json!({"id": "1", "name": "economy", "usage_count": 50}))
            .await
            .unwrap();
        let llm = FakeLlmGateway::new(vec!["no json here".into()]);
        extract_keywords(
            &doc_store,
            &llm,
            &dictionary(),
            "Zimbabwe economy grows",
            "The economy expanded this quarter.",
            None,
            Some("ZW"),
        )
        .await;

        let doc = doc_store.find_one("keywords", json!({"id": "1"})).await.unwrap().unwrap();
        assert_eq!(doc["usage_count"], 51);
    }
}
