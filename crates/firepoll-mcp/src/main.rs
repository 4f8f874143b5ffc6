use anyhow::Result;
use clap::{Parser, Subcommand};
use firepoll_core::{validate_http_url, CrawlBackend, CrawlOptions, ScrapeOptions};

#[derive(Parser, Debug)]
#[command(name = "firepoll")]
#[command(about = "Firecrawl crawl-job client (CLI + MCP stdio server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Start a crawl job (one POST; polling cadence is yours).
    Crawl(CrawlCmd),
    /// Check a crawl job once and print the bounded report.
    Status(StatusCmd),
    /// Scrape a single page synchronously.
    Scrape(ScrapeCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct CrawlCmd {
    /// The URL to crawl (http/https).
    #[arg(long)]
    url: String,
    /// Maximum discovery depth (default: 10, applied remotely).
    #[arg(long)]
    max_depth: Option<u32>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct StatusCmd {
    /// Crawl job id returned by `firepoll crawl`.
    #[arg(long)]
    job_id: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ScrapeCmd {
    /// The URL to scrape (http/https).
    #[arg(long)]
    url: String,
    /// Output format entry (repeatable), e.g. --scrape-format markdown
    #[arg(long = "scrape-format")]
    scrape_format: Vec<String>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn has_env(k: &str) -> bool {
    std::env::var(k)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("firepoll/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn print_payload(output: &str, payload: &serde_json::Value, text: impl FnOnce() -> String) {
    if output == "text" {
        println!("{}", text());
    } else {
        println!("{}", serde_json::to_string_pretty(payload).unwrap_or_default());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional env-file loader (opt-in). MCP server environments often are
    // not interactive shells; this gives users one place to keep keys.
    // Sets vars only when absent from the process env; never logs values.
    if let Ok(p) = std::env::var("FIREPOLL_ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() {
            if let Ok(txt) = std::fs::read_to_string(p) {
                for raw in txt.lines() {
                    let s = raw.trim();
                    if s.is_empty() || s.starts_with('#') {
                        continue;
                    }
                    let Some((k, v)) = s.split_once('=') else {
                        continue;
                    };
                    let (k, v) = (k.trim(), v.trim());
                    if !k.is_empty() && std::env::var_os(k).is_none() {
                        std::env::set_var(k, v);
                    }
                }
            }
        }
    }

    // Stdout belongs to the MCP transport; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            tracing::info!("firepoll {} serving MCP over stdio", env!("CARGO_PKG_VERSION"));
            mcp::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Crawl(args) => {
            let url = validate_http_url(&args.url)?;
            let client = firepoll_client::FirecrawlClient::from_env(http_client()?)?;
            let options = CrawlOptions {
                max_discovery_depth: args.max_depth,
                ..Default::default()
            };
            let start = client.start_crawl(url.as_str(), &options).await?;
            let payload = serde_json::to_value(&start)?;
            print_payload(&args.output, &payload, || {
                format!(
                    "Crawl job started: id={} url={} accepted={}\nCheck it with: firepoll status --job-id {}",
                    start.id, start.url, start.accepted, start.id
                )
            });
        }
        Commands::Status(args) => {
            let job_id = args.job_id.trim().to_string();
            let client = firepoll_client::FirecrawlClient::from_env(http_client()?)?;
            let raw = client.crawl_status(&job_id).await?;
            let report = firepoll_client::poll::summarize(&job_id, &raw);
            let payload = serde_json::to_value(&report)?;
            print_payload(&args.output, &payload, || {
                format!(
                    "status={} success={}\n{}",
                    report.status(),
                    report.success(),
                    payload["message"].as_str().unwrap_or_default()
                )
            });
        }
        Commands::Scrape(args) => {
            let url = validate_http_url(&args.url)?;
            let client = firepoll_client::FirecrawlClient::from_env(http_client()?)?;
            let options = ScrapeOptions {
                formats: if args.scrape_format.is_empty() {
                    None
                } else {
                    Some(args.scrape_format.iter().map(|f| serde_json::json!(f)).collect())
                },
                ..Default::default()
            };
            let payload = client.scrape(url.as_str(), &options).await?;
            print_payload(&args.output, &payload, || payload.to_string());
        }
        Commands::Doctor(args) => {
            let agent = firepoll_core::agent::crawl_agent();
            let payload = serde_json::json!({
                "success": true,
                "name": "firepoll",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "firecrawl": has_env("FIREPOLL_FIRECRAWL_API_KEY") || has_env("FIRECRAWL_API_KEY"),
                    "endpoint_override": has_env("FIREPOLL_FIRECRAWL_ENDPOINT"),
                },
                "agent": {
                    "system_prompt_chars": agent.system_prompt.len(),
                    "tools": agent.tools,
                },
            });
            print_payload(&args.output, &payload, || {
                format!(
                    "firepoll {}\nfirecrawl key configured: {}\nendpoint override: {}",
                    env!("CARGO_PKG_VERSION"),
                    payload["configured"]["firecrawl"],
                    payload["configured"]["endpoint_override"]
                )
            });
        }
        Commands::Version(args) => {
            let payload = serde_json::json!({
                "name": "firepoll",
                "version": env!("CARGO_PKG_VERSION"),
            });
            print_payload(&args.output, &payload, || {
                format!("firepoll {}", env!("CARGO_PKG_VERSION"))
            });
        }
    }

    Ok(())
}

#[cfg(feature = "stdio")]
mod mcp {
    use super::*;
    use firepoll_client::{poll, FirecrawlClient};
    use firepoll_core::{agent, Error as FirepollError};
    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use std::sync::Arc;

    const SCHEMA_VERSION: u64 = 1;

    #[path = "envelope.rs"]
    mod envelope;
    use envelope::*;

    fn tool_result(payload: serde_json::Value) -> CallToolResult {
        // Always attach structured content for machine consumers, and include a text fallback
        // for older clients/tests that only read `content[0].text`.
        let mut r = CallToolResult::structured(payload.clone());
        r.content = vec![Content::text(payload.to_string())];
        r
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct FirecrawlCrawlArgs {
        /// REQUIRED: The full URL to crawl (e.g., https://www.example.com).
        /// Must be a valid HTTP/HTTPS URL.
        #[serde(default)]
        url: Option<String>,
        /// Maximum depth to crawl. Default is 10. Higher values crawl more
        /// pages but take longer.
        #[serde(default)]
        max_depth: Option<u32>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct FirecrawlGetResultsArgs {
        /// REQUIRED: The crawl job id returned by firecrawl_crawl.
        #[serde(default)]
        job_id: Option<String>,
    }

    #[derive(Clone)]
    pub(crate) struct FirepollMcp {
        tool_router: RmcpToolRouter<Self>,
        http: reqwest::Client,
    }

    #[tool_router]
    impl FirepollMcp {
        pub(crate) fn new() -> Result<Self, McpError> {
            Ok(Self {
                tool_router: Self::tool_router(),
                http: http_client().map_err(|e| McpError::internal_error(e.to_string(), None))?,
            })
        }

        // Re-read env per call so a key added to the server environment is
        // picked up without a restart, and tests can script both paths.
        fn backend(&self) -> Result<Arc<dyn CrawlBackend>, FirepollError> {
            Ok(Arc::new(FirecrawlClient::from_env(self.http.clone())?))
        }

        #[tool(description = "Report firepoll configuration + the agent tool surface (no secrets)")]
        async fn firepoll_meta(&self) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            // Only report booleans / key names, never values.
            let agent = agent::crawl_agent();
            let mut payload = serde_json::json!({
                "success": true,
                "name": "firepoll",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "firecrawl": has_env("FIREPOLL_FIRECRAWL_API_KEY") || has_env("FIRECRAWL_API_KEY"),
                    "endpoint_override": has_env("FIREPOLL_FIRECRAWL_ENDPOINT"),
                },
                "agent": {
                    "system_prompt_chars": agent.system_prompt.len(),
                    "tools": agent.tools,
                },
            });
            add_envelope_fields(&mut payload, "firepoll_meta", t0.elapsed().as_millis());
            Ok(tool_result(payload))
        }

        #[tool(
            description = "Start a Firecrawl crawl job for a URL. Crawls the entire domain and returns a job id; poll firecrawl_get_results with that id for results."
        )]
        async fn firecrawl_crawl(
            &self,
            params: Parameters<Option<FirecrawlCrawlArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();

            let raw_url = args.url.unwrap_or_default();
            let url = match validate_http_url(&raw_url) {
                Ok(u) => u,
                Err(e) => {
                    let code = if raw_url.trim().is_empty() {
                        error_obj(
                            ErrorCode::InvalidParams,
                            "url must be provided",
                            "Pass url as a full http:// or https:// URL.",
                        )
                    } else {
                        error_value(&e)
                    };
                    let mut payload = serde_json::json!({
                        "success": false,
                        "url": raw_url,
                        "error": code,
                    });
                    add_envelope_fields(&mut payload, "firecrawl_crawl", t0.elapsed().as_millis());
                    return Ok(tool_result(payload));
                }
            };

            let backend = match self.backend() {
                Ok(b) => b,
                Err(e) => {
                    let mut payload = serde_json::json!({
                        "success": false,
                        "url": url.as_str(),
                        "error": error_value(&e),
                    });
                    add_envelope_fields(&mut payload, "firecrawl_crawl", t0.elapsed().as_millis());
                    return Ok(tool_result(payload));
                }
            };

            let options = CrawlOptions {
                max_discovery_depth: args.max_depth,
                ..Default::default()
            };
            let mut payload = match backend.start_crawl(url.as_str(), &options).await {
                Ok(start) => serde_json::json!({
                    "success": start.accepted,
                    "id": start.id,
                    "url": start.url,
                    "message": "Crawl job started. Use the crawl ID to check status.",
                }),
                Err(e) => serde_json::json!({
                    "success": false,
                    "url": url.as_str(),
                    "error": error_value(&e),
                }),
            };
            add_envelope_fields(&mut payload, "firecrawl_crawl", t0.elapsed().as_millis());
            Ok(tool_result(payload))
        }

        #[tool(
            description = "Get the status and results of a crawl job. If status is \"scraping\", call this tool again after a few seconds with the same job_id; only when status is \"completed\" is the data available. The result is a bounded summary (URLs + titles), never full page content."
        )]
        async fn firecrawl_get_results(
            &self,
            params: Parameters<Option<FirecrawlGetResultsArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();

            let job_id = args
                .job_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let Some(job_id) = job_id else {
                let mut payload = serde_json::json!({
                    "success": false,
                    "error": error_obj(
                        ErrorCode::InvalidParams,
                        "job_id must be provided",
                        "Pass the job id returned by firecrawl_crawl.",
                    ),
                });
                add_envelope_fields(&mut payload, "firecrawl_get_results", t0.elapsed().as_millis());
                return Ok(tool_result(payload));
            };

            let mut payload = match self.backend() {
                Ok(backend) => match backend.crawl_status(&job_id).await {
                    Ok(raw) => serde_json::to_value(poll::summarize(&job_id, &raw))
                        .unwrap_or_else(|_| serde_json::json!({ "success": false })),
                    Err(e) => serde_json::json!({
                        "success": false,
                        "job_id": job_id,
                        "error": error_value(&e),
                    }),
                },
                Err(e) => serde_json::json!({
                    "success": false,
                    "job_id": job_id,
                    "error": error_value(&e),
                }),
            };
            add_envelope_fields(&mut payload, "firecrawl_get_results", t0.elapsed().as_millis());
            Ok(tool_result(payload))
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for FirepollMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Firecrawl crawl-job tools. Crawls are asynchronous: firecrawl_crawl returns a job id; poll firecrawl_get_results with the same job_id until status is completed or failed. Outputs are JSON and schema-versioned."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio() -> Result<(), McpError> {
        let svc = FirepollMcp::new()?;
        let running = svc
            .serve(stdio())
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        // Keep the stdio server alive until the client closes.
        running
            .waiting()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(())
    }

}
