use std::sync::Arc;

use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use mukoko_core::adapters::doc_store::RpcDocStore;
use mukoko_core::adapters::edge_cache::PgEdgeCache;
use mukoko_core::adapters::http_fetcher::ReqwestFetcher;
use mukoko_core::adapters::kv_store::RetainerKvStore;
use mukoko_core::adapters::llm_gateway::AnthropicGateway;
use mukoko_core::adapters::vector_index::FastEmbedVectorIndex;
use mukoko_core::app::App;
use mukoko_core::config::Config;
use mukoko_core::{routes, scheduler};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.edge_cache_database_url);
    let pool = Pool::builder(manager)
        .build()
        .expect("failed to build edge-cache connection pool");

    let app = App {
        doc_store: Arc::new(RpcDocStore::new(&config.mongodb_cluster, &config.mongodb_database, &config.proxy_secret)),
        edge_cache: Arc::new(PgEdgeCache::new(pool.clone())),
        vector: Arc::new(FastEmbedVectorIndex::new(pool)),
        kv: Arc::new(RetainerKvStore::new()),
        llm: Arc::new(AnthropicGateway::new(&config.anthropic_api_key, &config.llm_model, config.llm_max_retries)),
        http: Arc::new(ReqwestFetcher::new()),
        config: config.clone(),
    };

    scheduler::spawn_all(app.clone());

    let router = routes::router(app).layer(tower_http::trace::TraceLayer::new_for_http()).layer(
        tower_http::cors::CorsLayer::permissive(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {}: {err}", config.bind_addr));

    tracing::info!(addr = %config.bind_addr, "mukoko-core listening");

    axum::serve(listener, router.into_make_service())
        .await
        .expect("server error");
}
