//! Agent-facing declarations: the tool surface an external orchestrator can
//! discover and invoke, and the one upward-facing chat operation.
//!
//! The reasoning loop itself (which tool to call, when, how often) is an
//! external capability. We model it as the [`Orchestrator`] trait and only
//! ship the data it needs: a system prompt plus named, typed tool specs.

use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    /// Invocation budget the orchestrator should enforce for this tool
    /// within one reasoning session. Polling tools need a large budget:
    /// the protocol expects many cheap status checks per job.
    pub max_tries: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentDefinition {
    pub system_prompt: String,
    pub tools: Vec<ToolSpec>,
}

pub const CRAWL_TOOL: &str = "firecrawl_crawl";
pub const GET_RESULTS_TOOL: &str = "firecrawl_get_results";

/// The crawl agent: a configuration object, not a loop.
pub fn crawl_agent() -> AgentDefinition {
    let system_prompt = [
        "You are a specialized web scraping agent powered by Firecrawl. Your primary function is to crawl websites and extract comprehensive data including categories, products, details, and images.",
        "When crawling a website, you MUST use the firecrawl_crawl tool with the url parameter set to the full URL (e.g., url: \"https://www.example.com\"). The tool requires the url parameter to be provided.",
        "The firecrawl_crawl tool returns a job ID. After calling firecrawl_crawl, you MUST use the firecrawl_get_results tool with the job_id parameter to retrieve the crawl results.",
        "CRITICAL: Crawls are asynchronous. If firecrawl_get_results returns status \"scraping\", you MUST wait 5-10 seconds and call firecrawl_get_results again with the same job_id. Keep checking repeatedly until the status is \"completed\" or \"failed\". Only when status is \"completed\" will the data be available.",
        "The firecrawl_get_results tool returns a summary with URLs and metadata when completed, not full page content, to avoid message size limits. Use the summary to understand the site structure and identify categories. Summarize the findings based on the URLs and titles provided.",
    ]
    .join("\n");

    AgentDefinition {
        system_prompt,
        tools: vec![
            ToolSpec {
                name: CRAWL_TOOL,
                description: "Crawl a website URL to extract all categories, products, details, and images. This tool will crawl the entire domain to get comprehensive data including all subpages and categories. You MUST provide the url parameter with the full URL to crawl.",
                params: vec![
                    ParamSpec {
                        name: "url",
                        param_type: ParamType::String,
                        description: "REQUIRED: The full URL to crawl (e.g., https://www.example.com). Must be a valid HTTP/HTTPS URL starting with http:// or https://.",
                        required: true,
                    },
                    ParamSpec {
                        name: "max_depth",
                        param_type: ParamType::Integer,
                        description: "Maximum depth to crawl. Default is 10. Higher values will crawl more pages but take longer.",
                        required: false,
                    },
                ],
                max_tries: 50,
            },
            ToolSpec {
                name: GET_RESULTS_TOOL,
                description: "Get the status and results of a crawl job. IMPORTANT: If status is \"scraping\", you MUST call this tool again after a few seconds to check again. Only when status is \"completed\" will the data be available. Keep calling this tool with the same job_id until status is \"completed\" or \"failed\".",
                params: vec![ParamSpec {
                    name: "job_id",
                    param_type: ParamType::String,
                    description: "REQUIRED: The crawl job ID returned by the firecrawl_crawl tool.",
                    required: true,
                }],
                max_tries: 50,
            },
        ],
    }
}

/// External reasoning loop: given a prompt, a tool surface, and a user
/// message, produce a final assistant message after zero or more tool calls.
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run(
        &self,
        system_prompt: &str,
        tools: &[ToolSpec],
        user_message: &str,
    ) -> Result<String>;
}

/// Reply shape of the upward-facing chat operation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const GENERIC_FAILURE: &str =
    "An error occurred while processing your message. Please try again.";

/// Run one user message through the orchestrator.
///
/// Hard failures collapse to a generic message; the underlying detail is
/// attached only when `debug` is set. Job-level failures never reach this
/// path: they are ordinary tool results the orchestrator reasons about.
pub async fn chat<O: Orchestrator + ?Sized>(
    orchestrator: &O,
    agent: &AgentDefinition,
    user_message: &str,
    debug: bool,
) -> ChatReply {
    if user_message.trim().is_empty() {
        return ChatReply {
            success: false,
            message: GENERIC_FAILURE.to_string(),
            error: debug.then(|| Error::InvalidParams("message must not be empty".to_string()).to_string()),
        };
    }

    match orchestrator
        .run(&agent.system_prompt, &agent.tools, user_message)
        .await
    {
        Ok(message) => ChatReply {
            success: true,
            message,
            error: None,
        },
        Err(e) => ChatReply {
            success: false,
            message: GENERIC_FAILURE.to_string(),
            error: debug.then(|| e.to_string()),
        },
    }
}
