//! Ranker (§4.11): eight-signal weighted scoring plus a diversity second pass.
//! Grounded in `recommendation/engine.rs`'s own multi-signal score-then-resort
//! pipeline (there: a handful of weighted signals summed per candidate, then
//! re-ordered); this generalises that to the eight signals and the explicit
//! diversity penalty §4.11 pins down.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

const RECENCY_HALF_LIFE_HOURS: f64 = 24.0;
const LN2: f64 = std::f64::consts::LN_2;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Preferences {
    pub followed_sources: Vec<String>,
    pub followed_authors: Vec<String>,
    pub followed_categories: Vec<String>,
    pub preferred_countries: Vec<String>,
    pub primary_country: Option<String>,
    pub category_interests: HashMap<String, f64>,
    pub recently_read: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RankableArticle {
    pub id: String,
    pub source_id: String,
    pub source: String,
    pub author: Option<String>,
    pub category_id: Option<String>,
    pub country_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub bookmark_count: i64,
    pub source_quality_score: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedArticle {
    pub id: String,
    pub score: f64,
}

/// §4.11. Raw per-signal scoring followed by the diversity re-sort.
pub fn rank_articles(articles: &[RankableArticle], preferences: &Preferences, now: DateTime<Utc>) -> Vec<RankedArticle> {
    let mut scored: Vec<(usize, f64)> = articles
        .iter()
        .enumerate()
        .map(|(i, a)| (i, raw_score(a, preferences, now)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut category_counts: HashMap<String, usize> = HashMap::new();
    for (idx, score) in scored.iter_mut() {
        let category = articles[*idx].category_id.clone().unwrap_or_default();
        let k = *category_counts.get(&category).unwrap_or(&0);
        *score -= 10.0 * k as f64;
        category_counts.insert(category, k + 1);
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .map(|(idx, score)| RankedArticle {
            id: articles[idx].id.clone(),
            score: round2(score),
        })
        .collect()
}

fn raw_score(article: &RankableArticle, preferences: &Preferences, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if preferences.followed_sources.contains(&article.source_id) || preferences.followed_sources.contains(&article.source) {
        score += 50.0;
    }
    if let Some(author) = &article.author {
        if preferences.followed_authors.contains(author) {
            score += 40.0;
        }
    }
    if let Some(category) = &article.category_id {
        if preferences.followed_categories.contains(category) {
            score += 30.0;
        }
    }
    if preferences.primary_country.as_deref() == article.country_id.as_deref() && article.country_id.is_some() {
        score += 35.0;
    }
    if let Some(category) = &article.category_id {
        if let Some(interest) = preferences.category_interests.get(category) {
            score += 20.0 * interest;
        }
    }

    score += 25.0 * recency_value(article.published_at, now);
    score += 15.0 * engagement_value(article);
    score += 20.0 * article.source_quality_score.unwrap_or(0.5);

    score
}

fn recency_value(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match published_at {
        None => 0.3,
        Some(ts) => {
            let hours_old = now.signed_duration_since(ts).num_seconds() as f64 / 3600.0;
            (-hours_old * LN2 / RECENCY_HALF_LIFE_HOURS).exp()
        }
    }
}

fn engagement_value(article: &RankableArticle) -> f64 {
    let engagement = article.view_count as f64 + 3.0 * article.like_count as f64 + 2.0 * article.bookmark_count as f64 + 1.0;
    (engagement.max(1.0).log10() / 3.0).max(0.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_article(id: &str, country: &str) -> RankableArticle {
        RankableArticle {
            id: id.to_string(),
            source_id: "s1".into(),
            source: "Herald".into(),
            author: None,
            category_id: Some("politics".into()),
            country_id: Some(country.to_string()),
            published_at: Some(Utc::now()),
            view_count: 10,
            like_count: 1,
            bookmark_count: 0,
            source_quality_score: Some(0.5),
        }
    }

    #[test]
    fn primary_country_boost_scenario_5() {
        let zw = base_article("zw", "ZW");
        let ke = base_article("ke", "KE");
        let preferences = Preferences {
            primary_country: Some("ZW".into()),
            ..Preferences::default()
        };
        let ranked = rank_articles(&[zw, ke], &preferences, Utc::now());
        assert_eq!(ranked[0].id, "zw");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn diversity_pass_reduces_repeat_category_scores() {
        let articles: Vec<RankableArticle> = (0..3)
            .map(|i| base_article(&i.to_string(), "ZW"))
            .collect();
        let ranked = rank_articles(&articles, &Preferences::default(), Utc::now());
        assert!(ranked[0].score >= ranked[1].score);
        assert!(ranked[1].score >= ranked[2].score);
    }

    #[test]
    fn recency_decays_toward_zero_as_article_ages() {
        let now = Utc::now();
        let fresh = recency_value(Some(now), now);
        let old = recency_value(Some(now - chrono::Duration::hours(240)), now);
        assert!(fresh > old);
    }

    #[test]
    fn missing_recency_uses_fixed_fallback() {
        assert_eq!(recency_value(None, Utc::now()), 0.3);
    }
}
