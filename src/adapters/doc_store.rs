//! Doc-store adapter (§2 component 1): uniform CRUD + aggregation over the primary
//! store via RPC. Grounded in the RPC-over-service-binding contract of the original
//! MongoDB client this supersedes — one POST per call, a single bearer secret, a flat
//! JSON action envelope — reimplemented here as a thin `reqwest` client the way
//! `discord/tools/fetch_content.rs` reaches external HTTP services
//! (`fetch_url_content_and_parse`).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
pub trait DocStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: Value,
        projection: Option<Value>,
        limit: Option<i64>,
    ) -> eyre::Result<Vec<Value>>;

    async fn find_one(&self, collection: &str, filter: Value) -> eyre::Result<Option<Value>>;

    async fn count(&self, collection: &str, filter: Value) -> eyre::Result<i64>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> eyre::Result<Vec<Value>>;

    async fn insert_one(&self, collection: &str, document: Value) -> eyre::Result<String>;

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> eyre::Result<Vec<String>>;

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64>;

    async fn update_many(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64>;

    async fn delete_one(&self, collection: &str, filter: Value) -> eyre::Result<u64>;

    async fn delete_many(&self, collection: &str, filter: Value) -> eyre::Result<u64>;
}

/// Talks to the document-store proxy over a single RPC endpoint, mirroring the
/// `{action, collection, ...}` envelope of the Python `MongoDBClient` this replaces.
pub struct RpcDocStore {
    client: reqwest::Client,
    endpoint: String,
    database: String,
    secret: String,
}

impl RpcDocStore {
    pub fn new(cluster: &str, database: &str, secret: &str) -> Self {
        RpcDocStore {
            client: reqwest::Client::new(),
            endpoint: format!("https://{cluster}/"),
            database: database.to_string(),
            secret: secret.to_string(),
        }
    }

    async fn request(&self, body: Value) -> eyre::Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.secret)
            .json(&body)
            .send()
            .await
            .map_err(|err| eyre::eyre!("doc-store RPC request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(eyre::eyre!(
                "doc-store RPC returned status {}",
                response.status()
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| eyre::eyre!("doc-store RPC returned invalid JSON: {err}"))
    }
}

#[async_trait]
impl DocStore for RpcDocStore {
    async fn find(
        &self,
        collection: &str,
        filter: Value,
        projection: Option<Value>,
        limit: Option<i64>,
    ) -> eyre::Result<Vec<Value>> {
        let body = json!({
            "action": "find",
            "database": self.database,
            "collection": collection,
            "filter": filter,
            "projection": projection,
            "limit": limit,
        });
        let result = self.request(body).await?;
        Ok(result
            .get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: Value) -> eyre::Result<Option<Value>> {
        Ok(self.find(collection, filter, None, Some(1)).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: Value) -> eyre::Result<i64> {
        let body = json!({
            "action": "count",
            "database": self.database,
            "collection": collection,
            "filter": filter,
        });
        let result = self.request(body).await?;
        Ok(result.get("count").and_then(|c| c.as_i64()).unwrap_or(0))
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> eyre::Result<Vec<Value>> {
        let body = json!({
            "action": "aggregate",
            "database": self.database,
            "collection": collection,
            "pipeline": pipeline,
        });
        let result = self.request(body).await?;
        Ok(result
            .get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> eyre::Result<String> {
        let body = json!({
            "action": "insert_one",
            "database": self.database,
            "collection": collection,
            "document": document,
        });
        let result = self.request(body).await?;
        result
            .get("inserted_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| eyre::eyre!("doc-store insert_one did not return an id"))
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> eyre::Result<Vec<String>> {
        let body = json!({
            "action": "insert_many",
            "database": self.database,
            "collection": collection,
            "documents": documents,
        });
        let result = self.request(body).await?;
        Ok(result
            .get("inserted_ids")
            .and_then(|v| v.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64> {
        let body = json!({
            "action": "update_one",
            "database": self.database,
            "collection": collection,
            "filter": filter,
            "update": update,
        });
        let result = self.request(body).await?;
        Ok(result.get("modified_count").and_then(|c| c.as_u64()).unwrap_or(0))
    }

    async fn update_many(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64> {
        let body = json!({
            "action": "update_many",
            "database": self.database,
            "collection": collection,
            "filter": filter,
            "update": update,
        });
        let result = self.request(body).await?;
        Ok(result.get("modified_count").and_then(|c| c.as_u64()).unwrap_or(0))
    }

    async fn delete_one(&self, collection: &str, filter: Value) -> eyre::Result<u64> {
        let body = json!({
            "action": "delete_one",
            "database": self.database,
            "collection": collection,
            "filter": filter,
        });
        let result = self.request(body).await?;
        Ok(result.get("deleted_count").and_then(|c| c.as_u64()).unwrap_or(0))
    }

    async fn delete_many(&self, collection: &str, filter: Value) -> eyre::Result<u64> {
        let body = json!({
            "action": "delete_many",
            "database": self.database,
            "collection": collection,
            "filter": filter,
        });
        let result = self.request(body).await?;
        Ok(result.get("deleted_count").and_then(|c| c.as_u64()).unwrap_or(0))
    }
}

/// In-memory fake honouring §3 invariants, for component and router tests.
#[derive(Default)]
pub struct InMemoryDocStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(doc: &Value, filter: &Value) -> bool {
        let Some(filter_obj) = filter.as_object() else {
            return true;
        };
        filter_obj.iter().all(|(key, expected)| {
            let actual = doc.get(key);
            if let Some(in_clause) = expected.get("$in") {
                in_clause
                    .as_array()
                    .map(|candidates| {
                        actual
                            .map(|a| candidates.iter().any(|c| c == a))
                            .unwrap_or(false)
                    })
                    .unwrap_or(false)
            } else {
                actual == Some(expected)
            }
        })
    }
}

#[async_trait]
impl DocStore for InMemoryDocStore {
    async fn find(
        &self,
        collection: &str,
        filter: Value,
        _projection: Option<Value>,
        limit: Option<i64>,
    ) -> eyre::Result<Vec<Value>> {
        let store = self.collections.lock().unwrap();
        let docs = store.get(collection).cloned().unwrap_or_default();
        let mut matched: Vec<Value> = docs.into_iter().filter(|d| Self::matches(d, &filter)).collect();
        if let Some(limit) = limit {
            matched.truncate(limit.max(0) as usize);
        }
        Ok(matched)
    }

    async fn find_one(&self, collection: &str, filter: Value) -> eyre::Result<Option<Value>> {
        Ok(self.find(collection, filter, None, Some(1)).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: Value) -> eyre::Result<i64> {
        Ok(self.find(collection, filter, None, None).await?.len() as i64)
    }

    async fn aggregate(&self, _collection: &str, _pipeline: Vec<Value>) -> eyre::Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn insert_one(&self, collection: &str, mut document: Value) -> eyre::Result<String> {
        let id = document
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if let Some(obj) = document.as_object_mut() {
            obj.entry("id").or_insert(json!(id.clone()));
        }
        let mut store = self.collections.lock().unwrap();
        store.entry(collection.to_string()).or_default().push(document);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> eyre::Result<Vec<String>> {
        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            ids.push(self.insert_one(collection, doc).await?);
        }
        Ok(ids)
    }

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64> {
        let mut store = self.collections.lock().unwrap();
        let docs = store.entry(collection.to_string()).or_default();
        for doc in docs.iter_mut() {
            if Self::matches(doc, &filter) {
                merge_set(doc, &update);
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn update_many(&self, collection: &str, filter: Value, update: Value) -> eyre::Result<u64> {
        let mut store = self.collections.lock().unwrap();
        let docs = store.entry(collection.to_string()).or_default();
        let mut count = 0;
        for doc in docs.iter_mut() {
            if Self::matches(doc, &filter) {
                merge_set(doc, &update);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_one(&self, collection: &str, filter: Value) -> eyre::Result<u64> {
        let mut store = self.collections.lock().unwrap();
        let docs = store.entry(collection.to_string()).or_default();
        if let Some(pos) = docs.iter().position(|d| Self::matches(d, &filter)) {
            docs.remove(pos);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn delete_many(&self, collection: &str, filter: Value) -> eyre::Result<u64> {
        let mut store = self.collections.lock().unwrap();
        let docs = store.entry(collection.to_string()).or_default();
        let before = docs.len();
        docs.retain(|d| !Self::matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }
}

fn merge_set(doc: &mut Value, update: &Value) {
    if let Some(set) = update.get("$set").and_then(|s| s.as_object()) {
        if let Some(obj) = doc.as_object_mut() {
            for (k, v) in set {
                obj.insert(k.clone(), v.clone());
            }
        }
    }
    if let Some(inc) = update.get("$inc").and_then(|s| s.as_object()) {
        if let Some(obj) = doc.as_object_mut() {
            for (k, v) in inc {
                let delta = v.as_i64().unwrap_or(0);
                let current = obj.get(k).and_then(|c| c.as_i64()).unwrap_or(0);
                obj.insert(k.clone(), json!(current + delta));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dedup_check_via_in_clause() {
        let store = InMemoryDocStore::new();
        store
            .insert_one("articles", json!({"rss_guid": "g1", "original_url": "https://a"}))
            .await
            .unwrap();

        let filter = json!({"rss_guid": {"$in": ["g1", "g2"]}});
        let found = store.find("articles", filter, None, None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn update_one_merges_set_fields() {
        let store = InMemoryDocStore::new();
        let id = store
            .insert_one("sources", json!({"id": "s1", "consecutive_failures": 3}))
            .await
            .unwrap();

        store
            .update_one(
                "sources",
                json!({"id": id}),
                json!({"$set": {"consecutive_failures": 0}}),
            )
            .await
            .unwrap();

        let doc = store
            .find_one("sources", json!({"id": "s1"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["consecutive_failures"], 0);
    }

    #[tokio::test]
    async fn update_one_applies_inc_operator() {
        let store = InMemoryDocStore::new();
        store
            .insert_one("keywords", json!({"id": "k1", "name": "economy", "usage_count": 5}))
            .await
            .unwrap();

        store
            .update_one("keywords", json!({"id": "k1"}), json!({"$inc": {"usage_count": 1}}))
            .await
            .unwrap();

        let doc = store
            .find_one("keywords", json!({"id": "k1"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["usage_count"], 6);
    }
}
