use firepoll_core::{CrawlBackend, CrawlOptions, CrawlStart, Error, Result, ScrapeOptions};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub mod poll;

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v2";
pub const DEFAULT_MAX_DISCOVERY_DEPTH: u32 = 10;

fn firecrawl_api_key_from_env() -> Option<String> {
    std::env::var("FIREPOLL_FIRECRAWL_API_KEY")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            std::env::var("FIRECRAWL_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
        })
}

fn base_url_from_env() -> String {
    // For tests / enterprise proxies, allow overriding the endpoint.
    std::env::var("FIREPOLL_FIRECRAWL_ENDPOINT")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Shape the `POST /crawl` body: fixed defaults, caller options on top,
/// the literal URL last.
///
/// The legacy `maxDepth` knob is rewritten to `maxDiscoveryDepth` and never
/// appears under its old name; when neither knob is given the depth is 10.
pub fn crawl_payload(url: &str, options: &CrawlOptions) -> Value {
    let mut payload = Map::new();
    payload.insert("crawlEntireDomain".to_string(), json!(true));
    payload.insert(
        "scrapeOptions".to_string(),
        json!({ "formats": [{ "type": "markdown" }, { "type": "html" }] }),
    );

    for (k, v) in &options.passthrough {
        // Depth knobs are resolved below so the rename is deterministic.
        if k == "maxDepth" || k == "maxDiscoveryDepth" {
            continue;
        }
        payload.insert(k.clone(), v.clone());
    }

    let legacy = options
        .max_depth
        .map(|n| json!(n))
        .or_else(|| options.passthrough.get("maxDepth").cloned());
    let discovery = options
        .max_discovery_depth
        .map(|n| json!(n))
        .or_else(|| options.passthrough.get("maxDiscoveryDepth").cloned());
    payload.insert(
        "maxDiscoveryDepth".to_string(),
        discovery
            .or(legacy)
            .unwrap_or_else(|| json!(DEFAULT_MAX_DISCOVERY_DEPTH)),
    );

    payload.insert("url".to_string(), json!(url));
    Value::Object(payload)
}

/// Normalize format entries to the structured v2 shape: bare strings become
/// `{type: "..."}`, already-structured entries pass through unchanged.
pub fn normalize_formats(formats: &[Value]) -> Vec<Value> {
    formats
        .iter()
        .map(|f| match f.as_str() {
            Some(s) => json!({ "type": s }),
            None => f.clone(),
        })
        .collect()
}

/// Shape the `POST /scrape` body. Without caller formats the markdown+html
/// default applies.
pub fn scrape_payload(url: &str, options: &ScrapeOptions) -> Value {
    let mut payload = Map::new();

    let formats = match &options.formats {
        Some(fs) => normalize_formats(fs),
        None => vec![json!({ "type": "markdown" }), json!({ "type": "html" })],
    };
    payload.insert("formats".to_string(), Value::Array(formats));

    for (k, v) in &options.passthrough {
        if k == "formats" {
            continue;
        }
        payload.insert(k.clone(), v.clone());
    }

    payload.insert("url".to_string(), json!(url));
    Value::Object(payload)
}

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirecrawlClient {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_key: api_key.into(),
            base_url,
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = firecrawl_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing FIREPOLL_FIRECRAWL_API_KEY (or FIRECRAWL_API_KEY)".to_string(),
            )
        })?;
        Ok(Self::new(client, api_key, base_url_from_env()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, req: reqwest::RequestBuilder, context: &str) -> Result<Value> {
        let resp = req
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Firecrawl request failed ({context}): {e}");
                Error::remote(format!("{context}: {e}"), None, None)
            })?;

        let status = resp.status();
        if !status.is_success() {
            // Keep the remote error body: it usually names the actual problem.
            let body = resp.json::<Value>().await.ok();
            tracing::error!(
                "Firecrawl request failed ({context}): HTTP {status}, response: {body:?}"
            );
            return Err(Error::remote(
                format!("{context}: HTTP {status}"),
                Some(status.as_u16()),
                body,
            ));
        }

        resp.json::<Value>().await.map_err(|e| {
            tracing::error!("Firecrawl response was not JSON ({context}): {e}");
            Error::remote(format!("{context}: invalid JSON response: {e}"), Some(status.as_u16()), None)
        })
    }
}

#[async_trait::async_trait]
impl CrawlBackend for FirecrawlClient {
    async fn start_crawl(&self, url: &str, options: &CrawlOptions) -> Result<CrawlStart> {
        let payload = crawl_payload(url, options);
        tracing::debug!("Starting crawl for {url}");
        let v = self
            .send(
                self.client
                    .post(format!("{}/crawl", self.base_url))
                    .json(&payload),
                &format!("POST /crawl for {url}"),
            )
            .await?;

        let parsed: CrawlStartResponse = serde_json::from_value(v).unwrap_or_default();
        Ok(CrawlStart {
            id: parsed.id.unwrap_or_default(),
            url: parsed.url.unwrap_or_else(|| url.to_string()),
            accepted: parsed.success.unwrap_or(true),
        })
    }

    async fn crawl_status(&self, job_id: &str) -> Result<Value> {
        if job_id.trim().is_empty() {
            return Err(Error::InvalidParams("job_id must be non-empty".to_string()));
        }
        self.send(
            self.client
                .get(format!("{}/crawl/{}", self.base_url, job_id)),
            &format!("GET /crawl/{job_id}"),
        )
        .await
    }

    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<Value> {
        let payload = scrape_payload(url, options);
        tracing::debug!("Scraping {url}");
        self.send(
            self.client
                .post(format!("{}/scrape", self.base_url))
                .json(&payload),
            &format!("POST /scrape for {url}"),
        )
        .await
    }
}

#[derive(Debug, Default, Deserialize)]
struct CrawlStartResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
