use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendingScope {
    Global,
    Country(&'static str),
}

impl TrendingScope {
    /// §4.13: `global` plus one per priority country.
    pub const PRIORITY_COUNTRIES: &'static [&'static str] = &["ZW", "ZA", "KE", "NG", "GH", "TZ"];

    pub fn kv_key(&self) -> String {
        match self {
            TrendingScope::Global => "trending:global".to_string(),
            TrendingScope::Country(cc) => format!("trending:{cc}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub keyword_id: String,
    pub keyword_name: String,
    pub article_count: i64,
    pub engagement_score: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingSnapshot {
    pub scope: String,
    pub topics: Vec<TrendingTopic>,
    pub updated_at: DateTime<Utc>,
}
