//! Quality scorer (§4.5): deterministic readability/structure score, no external
//! service involved. Pure function over `(title, content)`, grounded in the
//! weighted-sub-score composition style of `recommendation/engine.rs`'s own scoring
//! pass (several bounded sub-scores summed under fixed weights, then clamped).

use serde::{Deserialize, Serialize};

const MIN_CONTENT_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub length_score: f64,
    pub readability_score: f64,
    pub title_score: f64,
    pub structure_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityResult {
    pub quality_score: f64,
    pub breakdown: QualityBreakdown,
}

/// §4.5. Same inputs always yield the same output (P3).
pub fn score_quality(title: &str, content: &str) -> QualityResult {
    if content.len() < MIN_CONTENT_LEN {
        return QualityResult {
            quality_score: 0.3,
            breakdown: QualityBreakdown::default(),
        };
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    let word_count = words.len();

    let length_score = (word_count as f64 / 500.0).min(1.0);
    let readability_score = readability(content, word_count);
    let title_score = title_score(title);
    let structure_score = structure_score(content, &words);

    let raw = 0.30 * length_score + 0.30 * readability_score + 0.15 * title_score + 0.25 * structure_score;
    let quality_score = round2(raw.clamp(0.0, 1.0));

    QualityResult {
        quality_score,
        breakdown: QualityBreakdown {
            length_score,
            readability_score,
            title_score,
            structure_score,
        },
    }
}

/// Flesch-ease estimate when there are enough words to trust it; otherwise a
/// coarse sentence-length heuristic.
fn readability(content: &str, word_count: usize) -> f64 {
    let sentence_count = content.chars().filter(|c| matches!(c, '.' | '!' | '?')).count().max(1);
    let avg_sentence_len = word_count as f64 / sentence_count as f64;

    if word_count > 30 {
        let syllables = estimate_syllables(content);
        let ease = 206.835 - 1.015 * avg_sentence_len - 84.6 * (syllables as f64 / word_count as f64);
        (ease.max(0.0) / 70.0).min(1.0)
    } else if avg_sentence_len < 10.0 {
        0.5
    } else if avg_sentence_len <= 30.0 {
        0.8
    } else {
        0.4
    }
}

fn estimate_syllables(content: &str) -> usize {
    content
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let vowels = "aeiouy";
            let mut count = 0;
            let mut prev_was_vowel = false;
            for c in lower.chars() {
                let is_vowel = vowels.contains(c);
                if is_vowel && !prev_was_vowel {
                    count += 1;
                }
                prev_was_vowel = is_vowel;
            }
            count.max(1)
        })
        .sum()
}

fn title_score(title: &str) -> f64 {
    let word_count = title.split_whitespace().count();
    if (5..=15).contains(&word_count) {
        1.0
    } else if (3..=20).contains(&word_count) {
        0.7
    } else {
        0.4
    }
}

fn structure_score(content: &str, words: &[&str]) -> f64 {
    let mut score: f64 = 0.5;
    let sentence_count = content.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
    if sentence_count >= 3 {
        score += 0.1;
    }
    if content.contains(['"', '\'', '“', '”', '‘', '’']) {
        score += 0.1;
    }
    if content.matches('\n').count() >= 2 {
        score += 0.1;
    }
    let capitalised_in_first_200 = words
        .iter()
        .take(200)
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    if capitalised_in_first_200 > 5 {
        score += 0.1;
    }
    score.min(1.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_gets_fixed_floor_score() {
        let result = score_quality("Title", "too short");
        assert_eq!(result.quality_score, 0.3);
        assert_eq!(result.breakdown.length_score, 0.0);
    }

    #[test]
    fn quality_deterministic_scenario_3() {
        let content = "Zimbabwe news article with quotes and detail. ".repeat(20);
        let a = score_quality("Test determinism", &content);
        let b = score_quality("Test determinism", &content);
        assert_eq!(a.quality_score, b.quality_score);
        assert!(a.quality_score > 0.5 && a.quality_score < 0.9);
    }

    #[test]
    fn score_always_in_unit_interval() {
        let content = "word ".repeat(2000);
        let result = score_quality("A reasonably normal length title here", &content);
        assert!((0.0..=1.0).contains(&result.quality_score));
    }
}
