//! Clusterer (§4.10): semantic (embedding cosine) or lexical (Jaccard) grouping of
//! a small batch of articles, with a mandatory cross-source constraint. The greedy
//! walk-and-attach algorithm and the "abandon semantic, fall back to lexical on any
//! missing embedding" rule are grounded in `recommendation/engine.rs`'s own
//! similarity-matrix-then-greedy-group pass over candidate articles.

use std::collections::HashSet;

use crate::adapters::VectorIndex;

const SEMANTIC_THRESHOLD: f32 = 0.75;
const DEFAULT_LEXICAL_THRESHOLD: f32 = 0.35;
const DEFAULT_MAX_RELATED: usize = 4;
const DEFAULT_MAX_CLUSTERS: usize = 10;
const TITLE_CLAMP_CHARS: usize = 500;
const TOKEN_CLAMP_COUNT: usize = 50;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClusterInput {
    pub id: String,
    pub title: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
    Semantic,
    Lexical,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Cluster {
    pub primary_id: String,
    pub related_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    pub similarity_threshold: Option<f32>,
    pub max_related: Option<usize>,
    pub max_clusters: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ClusterResult {
    pub clusters: Vec<Cluster>,
    pub method: ClusterMethod,
}

/// §4.10. Tries semantic clustering first (using `vector`), falling back to lexical
/// Jaccard if any article's embedding cannot be obtained.
pub async fn cluster_articles(
    vector: &dyn VectorIndex,
    articles: &[ClusterInput],
    config: &ClusterConfig,
) -> ClusterResult {
    let max_related = config.max_related.unwrap_or(DEFAULT_MAX_RELATED);
    let max_clusters = config.max_clusters.unwrap_or(DEFAULT_MAX_CLUSTERS);

    if let Some(embeddings) = try_embed_all(vector, articles).await {
        let matrix = cosine_matrix(&embeddings);
        let clusters = greedy_cluster(articles, &matrix, SEMANTIC_THRESHOLD, max_related, max_clusters);
        return ClusterResult {
            clusters,
            method: ClusterMethod::Semantic,
        };
    }

    let threshold = config.similarity_threshold.unwrap_or(DEFAULT_LEXICAL_THRESHOLD);
    let token_sets: Vec<HashSet<String>> = articles.iter().map(|a| tokenize(&a.title)).collect();
    let matrix = jaccard_matrix(&token_sets);
    let clusters = greedy_cluster(articles, &matrix, threshold, max_related, max_clusters);

    ClusterResult {
        clusters,
        method: ClusterMethod::Lexical,
    }
}

async fn try_embed_all(vector: &dyn VectorIndex, articles: &[ClusterInput]) -> Option<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(articles.len());
    for article in articles {
        match vector.embed(&article.title, "").await {
            Ok(embedding) => embeddings.push(embedding),
            Err(_) => return None,
        }
    }
    Some(embeddings)
}

fn cosine_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let normalised: Vec<Vec<f32>> = embeddings.iter().map(|v| l2_normalise(v)).collect();
    let n = normalised.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in 0..n {
            matrix[i][j] = normalised[i].iter().zip(&normalised[j]).map(|(a, b)| a * b).sum();
        }
    }
    matrix
}

fn l2_normalise(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    v.iter().map(|x| x / norm).collect()
}

const STOPWORDS: &[&str] = &[
    // English
    "the", "and", "for", "with", "this", "that", "from", "has", "have", "are", "was", "were",
    // Shona
    "uye", "kuti", "mune", "pane",
    // Swahili
    "na", "ya", "wa", "kwa", "ni",
    // French
    "les", "des", "une", "pour", "dans",
    // Portuguese
    "que", "para", "com", "uma",
    // Arabic (transliterated commonly seen in translated feeds)
    "min", "ila", "ala",
];

fn tokenize(title: &str) -> HashSet<String> {
    let clamped: String = title.chars().take(TITLE_CLAMP_CHARS).collect();
    let lower = clamped.to_lowercase();
    let stripped: String = lower.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect();
    stripped
        .split_whitespace()
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(w))
        .take(TOKEN_CLAMP_COUNT)
        .map(String::from)
        .collect()
}

fn jaccard_matrix(sets: &[HashSet<String>]) -> Vec<Vec<f32>> {
    let n = sets.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in 0..n {
            matrix[i][j] = jaccard(&sets[i], &sets[j]);
        }
    }
    matrix
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// §4.10 greedy walk: input order, cross-source mandatory (I-Cluster-CS), capped by
/// `max_related` per cluster and `max_clusters` total.
fn greedy_cluster(
    articles: &[ClusterInput],
    similarity: &[Vec<f32>],
    threshold: f32,
    max_related: usize,
    max_clusters: usize,
) -> Vec<Cluster> {
    let n = articles.len();
    let mut assigned = vec![false; n];
    let mut clusters = Vec::new();

    for i in 0..n {
        if clusters.len() >= max_clusters {
            break;
        }
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut related = Vec::new();
        for j in (i + 1)..n {
            if assigned[j] {
                continue;
            }
            if articles[j].source == articles[i].source {
                continue;
            }
            if similarity[i][j] >= threshold {
                assigned[j] = true;
                related.push(articles[j].id.clone());
                if related.len() >= max_related {
                    break;
                }
            }
        }
        clusters.push(Cluster {
            primary_id: articles[i].id.clone(),
            related_ids: related,
        });
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::vector_index::InMemoryVectorIndex;

    #[tokio::test]
    async fn same_source_articles_never_merge_scenario_4() {
        let vector = InMemoryVectorIndex::new();
        let articles = vec![
            ClusterInput {
                id: "1".into(),
                title: "Zimbabwe economy grows".into(),
                source: "Herald".into(),
            },
            ClusterInput {
                id: "2".into(),
                title: "Zimbabwe economy grows".into(),
                source: "Herald".into(),
            },
        ];
        let result = cluster_articles(&vector, &articles, &ClusterConfig::default()).await;
        assert_eq!(result.clusters.len(), 2);
        assert!(result.clusters.iter().all(|c| c.related_ids.is_empty()));
    }

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a: HashSet<String> = ["zimbabwe".into(), "economy".into()].into_iter().collect();
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sets_is_zero() {
        let a: HashSet<String> = ["zimbabwe".into()].into_iter().collect();
        let b: HashSet<String> = ["kenya".into()].into_iter().collect();
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn cross_source_constraint_respected_lexically() {
        let sets = vec![
            tokenize("Zimbabwe economy grows strongly this quarter"),
            tokenize("Zimbabwe economy grows strongly this quarter"),
            tokenize("Kenya elections results announced today"),
        ];
        let matrix = jaccard_matrix(&sets);
        let articles = vec![
            ClusterInput { id: "1".into(), title: "a".into(), source: "Herald".into() },
            ClusterInput { id: "2".into(), title: "b".into(), source: "Nation".into() },
            ClusterInput { id: "3".into(), title: "c".into(), source: "Standard".into() },
        ];
        let clusters = greedy_cluster(&articles, &matrix, 0.35, 4, 10);
        assert_eq!(clusters[0].related_ids, vec!["2".to_string()]);
    }
}
