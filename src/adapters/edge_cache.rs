//! Edge-cache adapter (§2 component 4): prepared-statement SQL over the replicated
//! read store. Grounded in the same Diesel + `diesel-async` stack (`schema.rs`,
//! `models/recommendation.rs`) — same ORM, same `deadpool` pool, now pointed at the
//! read-optimised projection instead of a primary database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::{Article, Category, Keyword};
use crate::schema::{articles, categories, keywords};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EdgeArticleRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub source: String,
    pub category: Option<String>,
    pub country: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = keywords)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EdgeKeywordRow {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EdgeCategoryRow {
    pub id: String,
    pub name: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

pub struct SyncCounts {
    pub written: u64,
    pub errors: u64,
}

#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn upsert_articles(&self, rows: Vec<EdgeArticleRow>) -> eyre::Result<SyncCounts>;
    async fn upsert_keywords(&self, rows: Vec<EdgeKeywordRow>) -> eyre::Result<SyncCounts>;
    async fn upsert_categories(&self, rows: Vec<EdgeCategoryRow>) -> eyre::Result<SyncCounts>;

    /// §4.12 fallback path: `LIKE` on title/description, filtered by category, source
    /// and `published_at` range, sorted by `published_at` desc.
    async fn search_like(
        &self,
        query: &str,
        category: Option<&str>,
        source: Option<&str>,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> eyre::Result<Vec<EdgeArticleRow>>;

    async fn fetch_by_ids(&self, ids: &[String]) -> eyre::Result<Vec<EdgeArticleRow>>;

    /// §4.4 fallback dictionary source when the primary store is unavailable.
    async fn top_keywords(&self, limit: i64) -> eyre::Result<Vec<EdgeKeywordRow>>;

    async fn all_categories(&self) -> eyre::Result<Vec<EdgeCategoryRow>>;
}

pub struct PgEdgeCache {
    pool: Pool<AsyncPgConnection>,
}

impl PgEdgeCache {
    pub fn new(pool: Pool<AsyncPgConnection>) -> Self {
        PgEdgeCache { pool }
    }

    async fn conn(&self) -> eyre::Result<diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|err| eyre::eyre!("could not acquire edge-cache connection: {err}"))
    }
}

#[async_trait]
impl EdgeCache for PgEdgeCache {
    async fn upsert_articles(&self, rows: Vec<EdgeArticleRow>) -> eyre::Result<SyncCounts> {
        let mut conn = self.conn().await?;
        let mut written = 0;
        let mut errors = 0;
        // §4.9: per-row failures are counted but never fatal.
        for row in rows {
            let result = diesel::insert_into(articles::table)
                .values(&row)
                .on_conflict(articles::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .await;
            match result {
                Ok(_) => written += 1,
                Err(err) => {
                    tracing::warn!(article_id = %row.id, ?err, "edge-cache article upsert failed");
                    errors += 1;
                }
            }
        }
        Ok(SyncCounts { written, errors })
    }

    async fn upsert_keywords(&self, rows: Vec<EdgeKeywordRow>) -> eyre::Result<SyncCounts> {
        let mut conn = self.conn().await?;
        let mut written = 0;
        let mut errors = 0;
        for row in rows {
            let result = diesel::insert_into(keywords::table)
                .values(&row)
                .on_conflict(keywords::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .await;
            match result {
                Ok(_) => written += 1,
                Err(err) => {
                    tracing::warn!(keyword_id = %row.id, ?err, "edge-cache keyword upsert failed");
                    errors += 1;
                }
            }
        }
        Ok(SyncCounts { written, errors })
    }

    async fn upsert_categories(&self, rows: Vec<EdgeCategoryRow>) -> eyre::Result<SyncCounts> {
        let mut conn = self.conn().await?;
        let mut written = 0;
        let mut errors = 0;
        for row in rows {
            let result = diesel::insert_into(categories::table)
                .values(&row)
                .on_conflict(categories::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .await;
            match result {
                Ok(_) => written += 1,
                Err(err) => {
                    tracing::warn!(category_id = %row.id, ?err, "edge-cache category upsert failed");
                    errors += 1;
                }
            }
        }
        Ok(SyncCounts { written, errors })
    }

    async fn search_like(
        &self,
        query: &str,
        category: Option<&str>,
        source: Option<&str>,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> eyre::Result<Vec<EdgeArticleRow>> {
        let mut conn = self.conn().await?;
        let like_param = format!("%{query}%");
        let mut q = articles::table
            .filter(
                articles::title
                    .like(like_param.clone())
                    .or(articles::description.like(like_param)),
            )
            .into_boxed();
        if let Some(category) = category {
            q = q.filter(articles::category.eq(category));
        }
        if let Some(source) = source {
            q = q.filter(articles::source.eq(source));
        }
        if let Some(date_from) = date_from {
            q = q.filter(articles::published_at.ge(date_from));
        }
        if let Some(date_to) = date_to {
            q = q.filter(articles::published_at.le(date_to));
        }
        Ok(q.order(articles::published_at.desc())
            .limit(limit)
            .select(EdgeArticleRow::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> eyre::Result<Vec<EdgeArticleRow>> {
        let mut conn = self.conn().await?;
        Ok(articles::table
            .filter(articles::id.eq_any(ids))
            .select(EdgeArticleRow::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn top_keywords(&self, limit: i64) -> eyre::Result<Vec<EdgeKeywordRow>> {
        let mut conn = self.conn().await?;
        Ok(keywords::table
            .order(keywords::usage_count.desc())
            .limit(limit)
            .select(EdgeKeywordRow::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn all_categories(&self) -> eyre::Result<Vec<EdgeCategoryRow>> {
        let mut conn = self.conn().await?;
        Ok(categories::table
            .select(EdgeCategoryRow::as_select())
            .load(&mut conn)
            .await?)
    }
}

impl From<&Article> for EdgeArticleRow {
    fn from(a: &Article) -> Self {
        EdgeArticleRow {
            id: a.id.clone(),
            slug: a.slug.clone(),
            title: a.title.clone(),
            description: a.description.clone(),
            source: a.source.clone(),
            category: a.category_id.clone(),
            country: a.country_id.clone(),
            published_at: a.published_at,
        }
    }
}

impl From<&Keyword> for EdgeKeywordRow {
    fn from(k: &Keyword) -> Self {
        EdgeKeywordRow {
            id: k.id.clone(),
            name: k.name.clone(),
            category_id: k.category_id.clone(),
            usage_count: k.usage_count,
        }
    }
}

impl From<&Category> for EdgeCategoryRow {
    fn from(c: &Category) -> Self {
        EdgeCategoryRow {
            id: c.id.clone(),
            name: c.name.clone(),
            emoji: c.emoji.clone(),
            color: c.color.clone(),
        }
    }
}

/// In-memory fake for router/component tests that don't stand up Postgres.
#[derive(Default)]
pub struct InMemoryEdgeCache {
    articles: std::sync::Mutex<Vec<EdgeArticleRow>>,
    keywords: std::sync::Mutex<Vec<EdgeKeywordRow>>,
    categories: std::sync::Mutex<Vec<EdgeCategoryRow>>,
}

impl InMemoryEdgeCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EdgeCache for InMemoryEdgeCache {
    async fn upsert_articles(&self, rows: Vec<EdgeArticleRow>) -> eyre::Result<SyncCounts> {
        let mut store = self.articles.lock().unwrap();
        let written = rows.len() as u64;
        for row in rows {
            store.retain(|existing| existing.id != row.id);
            store.push(row);
        }
        Ok(SyncCounts { written, errors: 0 })
    }

    async fn upsert_keywords(&self, rows: Vec<EdgeKeywordRow>) -> eyre::Result<SyncCounts> {
        let mut store = self.keywords.lock().unwrap();
        let written = rows.len() as u64;
        for row in rows {
            store.retain(|existing| existing.id != row.id);
            store.push(row);
        }
        Ok(SyncCounts { written, errors: 0 })
    }

    async fn upsert_categories(&self, rows: Vec<EdgeCategoryRow>) -> eyre::Result<SyncCounts> {
        let mut store = self.categories.lock().unwrap();
        let written = rows.len() as u64;
        for row in rows {
            store.retain(|existing| existing.id != row.id);
            store.push(row);
        }
        Ok(SyncCounts { written, errors: 0 })
    }

    async fn search_like(
        &self,
        query: &str,
        category: Option<&str>,
        source: Option<&str>,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> eyre::Result<Vec<EdgeArticleRow>> {
        let query_lower = query.to_lowercase();
        let store = self.articles.lock().unwrap();
        let mut matched: Vec<EdgeArticleRow> = store
            .iter()
            .filter(|a| {
                (a.title.to_lowercase().contains(&query_lower)
                    || a.description.as_deref().unwrap_or("").to_lowercase().contains(&query_lower))
                    && category.is_none_or(|c| a.category.as_deref() == Some(c))
                    && source.is_none_or(|s| a.source == s)
                    && date_from.is_none_or(|from| a.published_at.is_some_and(|p| p >= from))
                    && date_to.is_none_or(|to| a.published_at.is_some_and(|p| p <= to))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        matched.truncate(limit.max(0) as usize);
        Ok(matched)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> eyre::Result<Vec<EdgeArticleRow>> {
        let store = self.articles.lock().unwrap();
        Ok(store.iter().filter(|a| ids.contains(&a.id)).cloned().collect())
    }

    async fn top_keywords(&self, limit: i64) -> eyre::Result<Vec<EdgeKeywordRow>> {
        let mut store = self.keywords.lock().unwrap().clone();
        store.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        store.truncate(limit.max(0) as usize);
        Ok(store)
    }

    async fn all_categories(&self) -> eyre::Result<Vec<EdgeCategoryRow>> {
        Ok(self.categories.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn like_search_is_case_insensitive_and_sorted_by_recency() {
        let cache = InMemoryEdgeCache::new();
        cache
            .upsert_articles(vec![
                EdgeArticleRow {
                    id: "1".into(),
                    slug: "old".into(),
                    title: "Zimbabwe Economy".into(),
                    description: None,
                    source: "Herald".into(),
                    category: None,
                    country: Some("ZW".into()),
                    published_at: Some(chrono::Utc::now() - chrono::Duration::days(1)),
                },
                EdgeArticleRow {
                    id: "2".into(),
                    slug: "new".into(),
                    title: "zimbabwe elections".into(),
                    description: None,
                    source: "Herald".into(),
                    category: None,
                    country: Some("ZW".into()),
                    published_at: Some(chrono::Utc::now()),
                },
            ])
            .await
            .unwrap();

        let results = cache.search_like("ZIMBABWE", None, None, None, None, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "2");
    }

    #[tokio::test]
    async fn like_search_respects_date_range() {
        let cache = InMemoryEdgeCache::new();
        cache
            .upsert_articles(vec![
                EdgeArticleRow {
                    id: "1".into(),
                    slug: "old".into(),
                    title: "Zimbabwe Economy".into(),
                    description: None,
                    source: "Herald".into(),
                    category: None,
                    country: Some("ZW".into()),
                    published_at: Some(chrono::Utc::now() - chrono::Duration::days(10)),
                },
                EdgeArticleRow {
                    id: "2".into(),
                    slug: "new".into(),
                    title: "zimbabwe elections".into(),
                    description: None,
                    source: "Herald".into(),
                    category: None,
                    country: Some("ZW".into()),
                    published_at: Some(chrono::Utc::now()),
                },
            ])
            .await
            .unwrap();

        let date_from = chrono::Utc::now() - chrono::Duration::days(1);
        let results = cache
            .search_like("zimbabwe", None, None, Some(date_from), None, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "2");
    }
}
