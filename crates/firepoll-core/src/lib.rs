use serde::{Deserialize, Serialize};

pub mod agent;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// Transport failure or non-2xx response from the crawl API.
    ///
    /// Carries the HTTP status and the parsed remote error body when
    /// available. Never produced for a well-formed `status=failed` job
    /// document; a failed job is a value, not an error.
    #[error("remote request failed: {context}")]
    Remote {
        context: String,
        status: Option<u16>,
        body: Option<serde_json::Value>,
    },
    #[error("orchestrator failed: {0}")]
    Orchestrator(String),
}

impl Error {
    pub fn remote(
        context: impl Into<String>,
        status: Option<u16>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self::Remote {
            context: context.into(),
            status,
            body,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Boundary check for user-supplied crawl targets. The crawl client itself
/// assumes its input already passed through here.
pub fn validate_http_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!(
            "{raw}: unsupported scheme {other:?} (must be http or https)"
        ))),
    }
}

/// Lifecycle states the remote crawl service reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    Scraping,
    Completed,
    Failed,
    /// Anything the remote reports that we do not recognize. Kept verbatim
    /// so the caller can decide; we never synthesize results from it.
    Unknown(String),
}

impl CrawlStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "scraping" => Self::Scraping,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Scraping => "scraping",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Options for starting a crawl. Named knobs for the settings we reason
/// about, plus a passthrough bag for forward-compatible remote options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Crawl depth (v2 name). Wins over `max_depth` when both are set.
    pub max_discovery_depth: Option<u32>,
    /// Legacy v1 knob; rewritten to `maxDiscoveryDepth` on the wire and
    /// never sent under its old name.
    pub max_depth: Option<u32>,
    /// Remote options merged into the payload verbatim, overriding our
    /// defaults. Keys use the remote API's spelling.
    #[serde(default)]
    pub passthrough: std::collections::BTreeMap<String, serde_json::Value>,
}

/// Options for a single-page scrape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Output formats; bare strings (`"markdown"`) are normalized to the
    /// structured `{type: "markdown"}` shape the remote expects.
    pub formats: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub passthrough: std::collections::BTreeMap<String, serde_json::Value>,
}

#[async_trait::async_trait]
pub trait CrawlBackend: Send + Sync {
    /// Start an asynchronous crawl job. The URL must already be validated.
    async fn start_crawl(&self, url: &str, options: &CrawlOptions) -> Result<CrawlStart>;
    /// One status check for an existing job; returns the raw remote
    /// document. Never sleeps or loops; cadence belongs to the caller.
    async fn crawl_status(&self, job_id: &str) -> Result<serde_json::Value>;
    /// Synchronous single-page fetch.
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<serde_json::Value>;
}

/// Acknowledgement returned when a crawl job is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStart {
    pub id: String,
    /// Echo of the submitted URL (remote may omit it; we fill it back in).
    pub url: String,
    pub accepted: bool,
}

/// One page in a bounded crawl summary: identity and a content-presence
/// flag, never the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub has_content: bool,
}

/// Structured outcome of a single status poll.
///
/// Serializes untagged so each variant carries exactly the keys of the wire
/// contract: non-terminal and failed reports never contain a `summary` key.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CrawlReport {
    InProgress {
        success: bool,
        status: String,
        job_id: String,
        total_pages: u64,
        completed_pages: u64,
        message: String,
    },
    Failed {
        success: bool,
        status: String,
        job_id: String,
        message: String,
    },
    Completed {
        success: bool,
        status: String,
        total_pages: u64,
        completed_pages: u64,
        summary: Vec<PageSummary>,
        has_more_data: bool,
        next_url: Option<String>,
        message: String,
    },
    Unknown {
        success: bool,
        status: String,
        job_id: String,
        message: String,
    },
}

impl CrawlReport {
    pub fn status(&self) -> &str {
        match self {
            Self::InProgress { status, .. }
            | Self::Failed { status, .. }
            | Self::Completed { status, .. }
            | Self::Unknown { status, .. } => status,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::InProgress { success, .. }
            | Self::Failed { success, .. }
            | Self::Completed { success, .. }
            | Self::Unknown { success, .. } => *success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_round_trips_known_values() {
        for s in ["scraping", "completed", "failed"] {
            assert_eq!(CrawlStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn status_parse_keeps_unrecognized_values_verbatim() {
        let st = CrawlStatus::parse("cancelled");
        assert_eq!(st, CrawlStatus::Unknown("cancelled".to_string()));
        assert_eq!(st.as_str(), "cancelled");
        assert!(!st.is_terminal());
    }

    #[test]
    fn in_progress_report_serializes_without_summary_key() {
        let r = CrawlReport::InProgress {
            success: true,
            status: "scraping".to_string(),
            job_id: "job_1".to_string(),
            total_pages: 120,
            completed_pages: 30,
            message: "wait".to_string(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], serde_json::json!(true));
        assert_eq!(v["status"], serde_json::json!("scraping"));
        assert!(v.get("summary").is_none());
        assert!(v.get("has_more_data").is_none());
    }

    #[test]
    fn failed_report_serializes_without_summary_key() {
        let r = CrawlReport::Failed {
            success: false,
            status: "failed".to_string(),
            job_id: "job_9".to_string(),
            message: "check".to_string(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], serde_json::json!(false));
        assert!(v.get("summary").is_none());
    }

    #[test]
    fn completed_report_keeps_null_titles_explicit() {
        let r = CrawlReport::Completed {
            success: true,
            status: "completed".to_string(),
            total_pages: 1,
            completed_pages: 1,
            summary: vec![PageSummary {
                url: "https://example.com/".to_string(),
                title: None,
                has_content: false,
            }],
            has_more_data: false,
            next_url: None,
            message: "done".to_string(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert!(v["summary"][0].get("title").is_some());
        assert!(v["summary"][0]["title"].is_null());
    }

    #[test]
    fn validate_http_url_accepts_http_and_https() {
        assert!(validate_http_url("https://example.com").is_ok());
        assert!(validate_http_url("http://example.com/a?b=c").is_ok());
        // Leading/trailing whitespace is operator noise, not an error.
        assert!(validate_http_url("  https://example.com  ").is_ok());
    }

    #[test]
    fn validate_http_url_rejects_other_schemes_and_garbage() {
        assert!(matches!(
            validate_http_url("ftp://example.com"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_http_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn remote_error_keeps_status_and_body() {
        let e = Error::remote(
            "POST /crawl HTTP 429",
            Some(429),
            Some(serde_json::json!({"error": "rate limited"})),
        );
        match e {
            Error::Remote { status, body, .. } => {
                assert_eq!(status, Some(429));
                assert_eq!(body.unwrap()["error"], serde_json::json!("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
