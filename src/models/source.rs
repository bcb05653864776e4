use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// §4.8: classification is piecewise-constant on `consecutive_failures`, boundaries {0,1,4,8}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Failing,
    Critical,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Healthy
    }
}

impl HealthStatus {
    /// P7: piecewise-constant with boundaries {0,1,4,8}.
    pub fn classify(consecutive_failures: i32) -> Self {
        match consecutive_failures {
            0 => HealthStatus::Healthy,
            1..=3 => HealthStatus::Degraded,
            4..=7 => HealthStatus::Failing,
            _ => HealthStatus::Critical,
        }
    }

    /// Adaptive fetch interval in minutes; `None` means never (critical sources are skipped).
    pub fn fetch_interval_minutes(self) -> Option<i64> {
        match self {
            HealthStatus::Healthy => Some(15),
            HealthStatus::Degraded => Some(30),
            HealthStatus::Failing => Some(60),
            HealthStatus::Critical => None,
        }
    }

    /// Total order used to detect a degradation (§4.8: "degrades compared to its stored prior status").
    pub fn rank(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Failing => 2,
            HealthStatus::Critical => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub feed_url: String,
    pub country_id: String,
    pub category_id: String,
    pub enabled: bool,
    #[serde(default)]
    pub consecutive_failures: i32,
    #[serde(default)]
    pub last_successful_fetch: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_fetch_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub source_quality_score: f64,
    #[serde(default)]
    pub avg_article_quality: Option<f64>,
    #[serde(default)]
    pub avg_engagement: Option<f64>,
    #[serde(default)]
    pub article_count_7d: i64,
}

impl Source {
    /// §4.7 country-priority table: ZW=1, …, MZ=16; unlisted codes sort after, by code.
    pub fn country_priority(country_id: &str) -> u32 {
        const PRIORITY: &[(&str, u32)] = &[
            ("ZW", 1),
            ("ZA", 2),
            ("KE", 3),
            ("NG", 4),
            ("GH", 5),
            ("TZ", 6),
            ("UG", 7),
            ("RW", 8),
            ("ET", 9),
            ("BW", 10),
            ("ZM", 11),
            ("MW", 12),
            ("EG", 13),
            ("MA", 14),
            ("NA", 15),
            ("MZ", 16),
        ];
        PRIORITY
            .iter()
            .find(|(code, _)| *code == country_id)
            .map(|(_, p)| *p)
            .unwrap_or(u32::MAX)
    }
}
