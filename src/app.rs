//! Application state (§9a): the `Arc<dyn Trait>` bundle every route handler and
//! background job closes over. Grounded in the same pattern of bundling pool handles and external clients (pool +
//! template engine bundled behind `Extension`), generalised from one Postgres pool
//! to the six capability adapters this system wires together.

use std::sync::Arc;

use crate::adapters::{DocStore, EdgeCache, HttpFetcher, KvStore, LlmGateway, VectorIndex};
use crate::config::Config;

#[derive(Clone)]
pub struct App {
    pub doc_store: Arc<dyn DocStore>,
    pub edge_cache: Arc<dyn EdgeCache>,
    pub vector: Arc<dyn VectorIndex>,
    pub kv: Arc<dyn KvStore>,
    pub llm: Arc<dyn LlmGateway>,
    pub http: Arc<dyn HttpFetcher>,
    pub config: Config,
}
