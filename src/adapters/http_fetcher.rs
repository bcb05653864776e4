//! HTTP-fetch adapter (one of the six capability interfaces): outbound fetches for
//! feed XML and web-article scraping. Grounded in `recommendation/crawler.rs`'s
//! `SiteLimiter` + `robotxt` politeness check and `discord/tools/fetch_content.rs`'s
//! `article_scraper` + `Readability` extraction pattern.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use robotxt::Robots;
use url::Url;

const ROBOTS_USER_AGENT: &str = "mukoko-news-bot";
const DEFAULT_CRAWL_DELAY: Duration = Duration::from_secs(1);

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Raw bytes over HTTP GET, following redirects — used for feed XML (§4.7).
    async fn fetch_bytes(&self, url: &str) -> eyre::Result<Vec<u8>>;

    /// Full page HTML, respecting robots.txt and per-domain crawl delay — used by
    /// the web-article extractor (§4.3 / `/content/scrape`).
    async fn fetch_html(&self, url: &str) -> eyre::Result<String>;
}

/// Serialises outbound fetches per domain, the way `recommendation/crawler.rs`
/// avoids hammering any one publisher.
struct SiteLimiter {
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl SiteLimiter {
    fn new() -> Self {
        SiteLimiter {
            next_allowed: Mutex::new(HashMap::new()),
        }
    }

    async fn wait(&self, domain: &str, delay: Duration) {
        loop {
            let now = Instant::now();
            let wait_until = {
                let mut map = self.next_allowed.lock().unwrap();
                let next = map.entry(domain.to_string()).or_insert(now);
                let wait_until = *next;
                *next = wait_until.max(now) + delay;
                wait_until
            };
            if wait_until <= now {
                return;
            }
            tokio::time::sleep(wait_until - now).await;
        }
    }
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    robots_cache: Mutex<HashMap<String, Robots>>,
    site_limiter: SiteLimiter,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        ReqwestFetcher {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(ROBOTS_USER_AGENT)
                .build()
                .unwrap_or_default(),
            robots_cache: Mutex::new(HashMap::new()),
            site_limiter: SiteLimiter::new(),
        }
    }

    async fn robots_allow(&self, url: &Url) -> bool {
        let domain = url.host_str().unwrap_or_default().to_string();
        if let Some(robots) = self.robots_cache.lock().unwrap().get(&domain) {
            return robots.is_relative_allowed(url.path());
        }

        let robots_url = format!("{}://{}/robots.txt", url.scheme(), domain);
        let robots = match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await.unwrap_or_default();
                Robots::from_bytes(body.as_bytes(), ROBOTS_USER_AGENT)
            }
            _ => Robots::from_bytes(b"", ROBOTS_USER_AGENT),
        };
        let allowed = robots.is_relative_allowed(url.path());
        self.robots_cache.lock().unwrap().insert(domain, robots);
        allowed
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_bytes(&self, url: &str) -> eyre::Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|err| eyre::eyre!("invalid URL {url}: {err}"))?;
        let domain = parsed.host_str().unwrap_or_default().to_string();
        self.site_limiter.wait(&domain, DEFAULT_CRAWL_DELAY).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| eyre::eyre!("fetch failed for {url}: {err}"))?;
        Ok(response
            .bytes()
            .await
            .map_err(|err| eyre::eyre!("could not read response body from {url}: {err}"))?
            .to_vec())
    }

    async fn fetch_html(&self, url: &str) -> eyre::Result<String> {
        let parsed = Url::parse(url).map_err(|err| eyre::eyre!("invalid URL {url}: {err}"))?;
        if !self.robots_allow(&parsed).await {
            return Err(eyre::eyre!("robots.txt disallows fetching {url}"));
        }
        let domain = parsed.host_str().unwrap_or_default().to_string();
        self.site_limiter.wait(&domain, DEFAULT_CRAWL_DELAY).await;

        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes).map_err(|err| eyre::eyre!("non-UTF-8 page body from {url}: {err}"))
    }
}

/// Canned fake keyed by URL — tests register fixtures instead of hitting the network.
#[derive(Default)]
pub struct FakeHttpFetcher {
    pub pages: std::collections::HashMap<String, String>,
}

impl FakeHttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl HttpFetcher for FakeHttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> eyre::Result<Vec<u8>> {
        self.pages
            .get(url)
            .map(|s| s.as_bytes().to_vec())
            .ok_or_else(|| eyre::eyre!("no fixture registered for {url}"))
    }

    async fn fetch_html(&self, url: &str) -> eyre::Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no fixture registered for {url}"))
    }
}
