use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    pub source: String,
    pub source_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub original_url: String,
    pub rss_guid: String,
    pub content_hash: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub bookmark_count: i64,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub ai_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// §3 I-A3 / §4.6: first 16 hex chars of SHA-256(title ⊕ content).
    pub fn content_hash(title: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 16)
    }

    /// §3 I-A1 dedup key, honoured by the feed collector's bulk existence check (§4.7 I-Dedup).
    pub fn engagement(&self) -> f64 {
        (self.view_count + 3 * self.like_count + 2 * self.bookmark_count) as f64
    }
}

fn hex_prefix(bytes: &[u8], hex_len: usize) -> String {
    let mut s = String::with_capacity(hex_len);
    for byte in bytes {
        if s.len() >= hex_len {
            break;
        }
        s.push_str(&format!("{byte:02x}"));
    }
    s.truncate(hex_len);
    s
}

/// §4.1: lowercased, non-word chars stripped, whitespace collapsed to single `-`, clamped to 80.
pub fn generate_slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped: String = lower
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let words: Vec<&str> = stripped.split_whitespace().collect();
    let mut slug = words.join("-");
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let clamped: String = slug.chars().take(80).collect();
    clamped.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_matches_scenario_1() {
        assert_eq!(generate_slug("Zimbabwe economy grows 5%"), "zimbabwe-economy-grows-5");
    }

    #[test]
    fn slug_is_always_url_safe() {
        let slug = generate_slug("  Hello!! World... -- ## 123  ");
        assert!(slug.len() <= 80);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    }

    #[test]
    fn slug_clamps_to_80_chars() {
        let long_title = "word ".repeat(40);
        let slug = generate_slug(&long_title);
        assert!(slug.len() <= 80);
        assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    }

    #[test]
    fn content_hash_is_deterministic_and_16_hex_chars() {
        let a = Article::content_hash("Title", "Content");
        let b = Article::content_hash("Title", "Content");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
