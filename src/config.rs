#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,

    /// Bind address for the HTTP surface, e.g. 0.0.0.0:8080
    pub bind_addr: String,

    /// Host for the document-store RPC proxy fronting the primary store.
    pub mongodb_cluster: String,
    pub mongodb_database: String,
    /// Bearer secret presented to the doc-store RPC proxy.
    pub proxy_secret: String,

    pub ai_gateway_id: Option<String>,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_max_retries: u32,

    /// Postgres DSN backing the edge-cache adapter.
    pub edge_cache_database_url: String,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::warn!("missing environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

impl Config {
    pub fn new_from_env() -> Self {
        let env = match var("ENVIRONMENT") {
            Ok(Some(env)) => match env.as_str() {
                "dev" => Env::Dev,
                "staging" => Env::Staging,
                "production" => Env::Production,
                _ => Env::Dev,
            },
            _ => Env::Dev,
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or(Some("0.0.0.0:8080".to_string()))
            .unwrap_or("0.0.0.0:8080".to_string());

        let llm_model = var("LLM_MODEL")
            .unwrap_or(Some("claude-sonnet-4-5-20250929".to_string()))
            .unwrap_or("claude-sonnet-4-5-20250929".to_string());

        let llm_max_retries = var("LLM_MAX_RETRIES")
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Config {
            env,
            bind_addr,
            mongodb_cluster: required_var("MONGODB_CLUSTER"),
            mongodb_database: required_var("MONGODB_DATABASE"),
            proxy_secret: required_var("PROXY_SECRET"),
            ai_gateway_id: var("AI_GATEWAY_ID").unwrap_or(None),
            anthropic_api_key: required_var("ANTHROPIC_API_KEY"),
            llm_model,
            llm_max_retries,
            edge_cache_database_url: required_var("EDGE_CACHE_DATABASE_URL"),
        }
    }
}
