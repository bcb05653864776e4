use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub usage_count: i64,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleKeywordLink {
    pub article_id: String,
    pub keyword_id: String,
    pub relevance_score: f64,
}
