//! Source-health manager (§4.8): classification, adaptive fetch admission, and the
//! periodic source-quality recompute. Grounded in the same health-tracking
//! idiom in `recommendation/crawler.rs` (it tracks `consecutive_failures` per source
//! and reasons about "should I fetch this now" before doing so); this module
//! generalises that single-purpose check into the full classify/admit/score triad.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::adapters::DocStore;
use crate::models::source::HealthStatus;
use crate::models::Source;

/// §4.8 `should_fetch`: false iff critical, true iff no prior fetch timestamp or the
/// adaptive interval has elapsed.
pub fn should_fetch(source: &Source, now: DateTime<Utc>) -> bool {
    if source.health_status == HealthStatus::Critical {
        return false;
    }
    let Some(interval_minutes) = source.health_status.fetch_interval_minutes() else {
        return false;
    };

    let reference = source.last_successful_fetch.or(source.last_fetch_at);
    match reference {
        None => true,
        Some(last) => {
            let elapsed = now.signed_duration_since(last);
            elapsed.num_minutes() >= interval_minutes
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityAudit {
    pub source_id: String,
    pub source_quality_score: f64,
    pub avg_article_quality: Option<f64>,
    pub avg_engagement: Option<f64>,
    pub article_count_7d: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthAlert {
    pub source_id: String,
    pub previous_status: HealthStatus,
    pub new_status: HealthStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthAuditSummary {
    pub sources_scanned: u64,
    pub scores_updated: u64,
    pub alerts: Vec<HealthAlert>,
}

/// §4.8: every 6 hours, recompute `source_quality_score` for every enabled source
/// from its last-7-day article aggregates, and raise an alert for any source whose
/// health rank has worsened since its last stored status.
pub async fn audit_sources(doc_store: &dyn DocStore) -> eyre::Result<HealthAuditSummary> {
    let mut summary = HealthAuditSummary::default();

    let sources = doc_store
        .find("rss_sources", json!({"enabled": true}), None, None)
        .await?;

    for doc in sources {
        summary.sources_scanned += 1;
        let Some(source): Option<Source> = serde_json::from_value(doc.clone()).ok() else {
            continue;
        };

        let stats = aggregate_recent_quality(doc_store, &source.id).await?;
        let composite = composite_quality(&stats);

        let new_status = HealthStatus::classify(source.consecutive_failures);
        if new_status.rank() > source.health_status.rank() {
            summary.alerts.push(HealthAlert {
                source_id: source.id.clone(),
                previous_status: source.health_status,
                new_status,
            });
        }

        let update = json!({"$set": {
            "source_quality_score": composite,
            "avg_article_quality": stats.avg_quality,
            "avg_engagement": stats.avg_engagement,
            "article_count_7d": stats.count,
            "health_status": new_status,
        }});
        doc_store
            .update_one("rss_sources", json!({"id": source.id}), update)
            .await?;
        summary.scores_updated += 1;
    }

    Ok(summary)
}

struct RecentStats {
    avg_quality: Option<f64>,
    avg_engagement: Option<f64>,
    count: i64,
}

async fn aggregate_recent_quality(doc_store: &dyn DocStore, source_id: &str) -> eyre::Result<RecentStats> {
    let since = Utc::now() - chrono::Duration::days(7);
    let docs = doc_store
        .find(
            "articles",
            json!({"source_id": source_id, "created_at": {"$gte": since}}),
            None,
            None,
        )
        .await?;

    if docs.is_empty() {
        return Ok(RecentStats {
            avg_quality: None,
            avg_engagement: None,
            count: 0,
        });
    }

    let count = docs.len() as i64;
    let total_quality: f64 = docs.iter().filter_map(|d| get_f64(d, "quality_score")).sum::<f64>();
    let quality_samples = docs.iter().filter(|d| get_f64(d, "quality_score").is_some()).count();

    let total_engagement: f64 = docs
        .iter()
        .map(|d| {
            let views = get_f64(d, "view_count").unwrap_or(0.0);
            let likes = get_f64(d, "like_count").unwrap_or(0.0);
            let bookmarks = get_f64(d, "bookmark_count").unwrap_or(0.0);
            views + 3.0 * likes + 2.0 * bookmarks
        })
        .sum();

    Ok(RecentStats {
        avg_quality: (quality_samples > 0).then(|| total_quality / quality_samples as f64),
        avg_engagement: Some(total_engagement / count as f64),
        count,
    })
}

fn get_f64(doc: &Value, key: &str) -> Option<f64> {
    doc.get(key).and_then(|v| v.as_f64())
}

/// §4.8 composite: `0.6·avg_quality + 0.3·min(log10(engagement+1)/3, 1) + 0.1·min(count/50, 1)`.
fn composite_quality(stats: &RecentStats) -> f64 {
    let avg_quality = stats.avg_quality.unwrap_or(0.0);
    let engagement = stats.avg_engagement.unwrap_or(0.0);
    let engagement_term = (((engagement + 1.0).log10()) / 3.0).min(1.0).max(0.0);
    let count_term = (stats.count as f64 / 50.0).min(1.0);
    round2(0.6 * avg_quality + 0.3 * engagement_term + 0.1 * count_term)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(consecutive_failures: i32, last_successful_fetch: Option<DateTime<Utc>>) -> Source {
        Source {
            id: "s1".into(),
            name: "Herald".into(),
            feed_url: "https://example.com/rss".into(),
            country_id: "ZW".into(),
            category_id: "politics".into(),
            enabled: true,
            consecutive_failures,
            last_successful_fetch,
            last_fetch_at: None,
            last_error_at: None,
            last_error: None,
            health_status: HealthStatus::classify(consecutive_failures),
            source_quality_score: 0.5,
            avg_article_quality: None,
            avg_engagement: None,
            article_count_7d: 0,
        }
    }

    #[test]
    fn health_adaptive_skip_scenario_6() {
        let source = source_with(10, Some(Utc::now() - chrono::Duration::minutes(10)));
        assert_eq!(source.health_status, HealthStatus::Critical);
        assert!(!should_fetch(&source, Utc::now()));
    }

    #[test]
    fn should_fetch_true_with_no_prior_timestamps() {
        let source = source_with(0, None);
        assert!(should_fetch(&source, Utc::now()));
    }

    #[test]
    fn should_fetch_respects_adaptive_interval() {
        let source = source_with(0, Some(Utc::now() - chrono::Duration::minutes(5)));
        assert!(!should_fetch(&source, Utc::now()));
        let source = source_with(0, Some(Utc::now() - chrono::Duration::minutes(20)));
        assert!(should_fetch(&source, Utc::now()));
    }

    #[test]
    fn composite_quality_is_bounded() {
        let stats = RecentStats {
            avg_quality: Some(0.9),
            avg_engagement: Some(1000.0),
            count: 100,
        };
        let score = composite_quality(&stats);
        assert!((0.0..=1.0).contains(&score));
    }
}
