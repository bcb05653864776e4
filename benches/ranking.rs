use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mukoko_core::quality_scorer::score_quality;
use mukoko_core::ranker::{rank_articles, Preferences, RankableArticle};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_rank");
    for n in [10, 100, 1000, 10000].iter() {
        let articles = generate_articles(*n);
        let preferences = generate_preferences();
        group.bench_function(BenchmarkId::new("rank_articles", n), |b| {
            b.iter(|| rank_articles(&articles, &preferences, Utc::now()))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("quality_score");
    let short = ("A short headline".to_string(), "Too short to score well.".repeat(1).to_string());
    let long = (
        "A properly reported headline about regional trade policy".to_string(),
        "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(80),
    );
    for (label, (title, content)) in [("short_article", short), ("long_article", long)] {
        group.bench_function(label, |b| b.iter(|| score_quality(&title, &content)));
    }
    group.finish();
}

fn generate_articles(n: usize) -> Vec<RankableArticle> {
    let sources = ["Herald", "Nation", "Standard", "Monitor", "Citizen"];
    let categories = ["politics", "business", "sport", "health"];
    let countries = ["ZW", "KE", "NG", "ZA"];
    let now = Utc::now();

    (0..n)
        .map(|i| RankableArticle {
            id: format!("article-{i}"),
            source_id: format!("source-{}", i % sources.len()),
            source: sources[i % sources.len()].to_string(),
            author: Some(format!("author-{}", i % 7)),
            category_id: Some(categories[i % categories.len()].to_string()),
            country_id: Some(countries[i % countries.len()].to_string()),
            published_at: Some(now - Duration::hours((i % 72) as i64)),
            view_count: (i * 13 % 5000) as i64,
            like_count: (i * 3 % 300) as i64,
            bookmark_count: (i % 50) as i64,
            source_quality_score: Some(0.4 + (i % 6) as f64 * 0.1),
        })
        .collect()
}

fn generate_preferences() -> Preferences {
    Preferences {
        followed_sources: vec!["source-0".to_string(), "Nation".to_string()],
        followed_authors: vec!["author-2".to_string()],
        followed_categories: vec!["politics".to_string()],
        preferred_countries: vec!["ZW".to_string(), "KE".to_string()],
        primary_country: Some("ZW".to_string()),
        category_interests: Default::default(),
        recently_read: vec!["article-3".to_string()],
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
