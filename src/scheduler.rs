//! Scheduler (§4.15): background dispatch of the four recurring jobs onto
//! `tokio::time::interval` loops. Grounded in the ambient-stack mapping's choice of
//! `tokio::spawn` + `interval` over a cron crate — no background jobs run this way
//! elsewhere in the corpus, but the `tokio`-everywhere style (`#[tokio::main]`,
//! `tokio::spawn` for the retainer cache monitor) is the idiom this follows.

use std::time::Duration;

use crate::app::App;

const COLLECTOR_INTERVAL: Duration = Duration::from_secs(15 * 60);
const EDGE_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);
const TRENDING_INTERVAL: Duration = Duration::from_secs(30 * 60);
const HEALTH_AUDIT_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Spawns the four background loops. Each job logs its own name, elapsed time, and
/// outcome; none ever panics the task or takes down the others.
pub fn spawn_all(app: App) {
    spawn_loop(app.clone(), "feed_collector", COLLECTOR_INTERVAL, |app| async move {
        let summary = crate::feed::collector::run_collector(
            app.doc_store.as_ref(),
            app.edge_cache.as_ref(),
            app.http.as_ref(),
            app.llm.as_ref(),
            app.vector.as_ref(),
        )
        .await;
        Ok(format!("inserted {} articles across {} sources", summary.articles_inserted, summary.sources_succeeded))
    });

    spawn_loop(app.clone(), "edge_cache_sync", EDGE_SYNC_INTERVAL, |app| async move {
        let summary = crate::edge_sync::sync_edge_cache(app.doc_store.as_ref(), app.edge_cache.as_ref()).await?;
        Ok(format!("wrote {} articles, {} keywords, {} categories", summary.articles_written, summary.keywords_written, summary.categories_written))
    });

    spawn_loop(app.clone(), "trending_refresh", TRENDING_INTERVAL, |app| async move {
        let snapshots = crate::trending_engine::refresh_all_scopes(app.doc_store.as_ref(), app.kv.as_ref()).await;
        Ok(format!("refreshed {} trending scopes", snapshots.len()))
    });

    spawn_loop(app, "source_health_audit", HEALTH_AUDIT_INTERVAL, |app| async move {
        let summary = crate::health::audit_sources(app.doc_store.as_ref()).await?;
        Ok(format!("scanned {} sources, {} alerts", summary.sources_scanned, summary.alerts.len()))
    });
}

fn spawn_loop<F, Fut>(app: App, name: &'static str, period: Duration, job: F)
where
    F: Fn(App) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = eyre::Result<String>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let start = std::time::Instant::now();
            match job(app.clone()).await {
                Ok(detail) => {
                    tracing::info!(job = name, elapsed_ms = start.elapsed().as_millis() as u64, %detail, "scheduled job finished");
                }
                Err(err) => {
                    tracing::error!(job = name, elapsed_ms = start.elapsed().as_millis() as u64, ?err, "scheduled job failed");
                }
            }
        }
    });
}
