//! Turn one raw crawl-status document into an actionable, size-bounded
//! report.
//!
//! Exactly one status check per invocation: the report tells the caller
//! whether to keep polling, give up, or read the summary. Retry cadence and
//! looping belong to whoever drives the tool (an MCP client, a human at the
//! CLI), never to this module.

use firepoll_core::{CrawlReport, CrawlStatus, PageSummary};
use serde_json::Value;

/// Completed summaries carry at most this many pages, in original order.
pub const PAGE_SUMMARY_CAP: usize = 50;

fn page_summary(page: &Value) -> PageSummary {
    // URL fallback chain: `url` -> `sourceURL` -> literal "unknown".
    let url = page
        .get("url")
        .and_then(|v| v.as_str())
        .or_else(|| page.get("sourceURL").and_then(|v| v.as_str()))
        .unwrap_or("unknown")
        .to_string();
    let title = page
        .get("metadata")
        .and_then(|m| m.get("title"))
        .and_then(|v| v.as_str())
        .or_else(|| page.get("title").and_then(|v| v.as_str()))
        .map(|s| s.to_string());
    let has_content = page.get("markdown").is_some_and(|v| !v.is_null())
        || page.get("html").is_some_and(|v| !v.is_null());
    PageSummary {
        url,
        title,
        has_content,
    }
}

/// Classify one status document and, on completion, project the page list
/// into a bounded summary (URL + title + content-presence flag, no content).
pub fn summarize(job_id: &str, raw: &Value) -> CrawlReport {
    let status = CrawlStatus::parse(raw.get("status").and_then(|s| s.as_str()).unwrap_or("unknown"));
    let empty = Vec::new();
    let data = raw
        .get("data")
        .and_then(|d| d.as_array())
        .unwrap_or(&empty);
    // The remote's own counters can lag `data`; `completed` falls back to
    // the page-array length, `total` to 0.
    let total = raw.get("total").and_then(|t| t.as_u64()).unwrap_or(0);
    let completed = raw
        .get("completed")
        .and_then(|c| c.as_u64())
        .unwrap_or(data.len() as u64);

    match status {
        CrawlStatus::Scraping => CrawlReport::InProgress {
            success: true,
            status: "scraping".to_string(),
            job_id: job_id.to_string(),
            total_pages: total,
            completed_pages: completed,
            message: format!(
                "Crawl is still in progress (status: scraping, {completed}/{total} pages completed). \
                 Wait 5-10 seconds, then call this tool again with the same job_id ({job_id}) to check status. \
                 Large crawls can take several minutes. Keep checking until status is 'completed'."
            ),
        },
        CrawlStatus::Failed => CrawlReport::Failed {
            success: false,
            status: "failed".to_string(),
            job_id: job_id.to_string(),
            message: "Crawl job failed. Please check the error details or try starting a new crawl."
                .to_string(),
        },
        CrawlStatus::Completed => {
            let summary: Vec<PageSummary> =
                data.iter().take(PAGE_SUMMARY_CAP).map(page_summary).collect();
            // Truncation is decided by the page array we actually got; the
            // message quotes the remote `total`, which may disagree.
            let truncated = data.len() > PAGE_SUMMARY_CAP;
            let next_url = raw
                .get("next")
                .and_then(|n| n.as_str())
                .map(|s| s.to_string());
            let has_more_data = raw.get("next").is_some_and(|n| !n.is_null());
            let message = if truncated {
                format!(
                    "Crawl completed with {total} pages. Showing first {PAGE_SUMMARY_CAP} URLs. \
                     Full content available but not included in this summary to avoid message size limits."
                )
            } else {
                format!(
                    "Crawl completed with {total} pages. \
                     Full content not included in summary to avoid message size limits."
                )
            };
            CrawlReport::Completed {
                success: true,
                status: "completed".to_string(),
                total_pages: total,
                completed_pages: completed,
                summary,
                has_more_data,
                next_url,
                message,
            }
        }
        CrawlStatus::Unknown(other) => CrawlReport::Unknown {
            success: false,
            status: other.clone(),
            job_id: job_id.to_string(),
            message: format!(
                "Crawl job reported an unrecognized status '{other}'. No summary was produced; \
                 check the job again or start a new crawl."
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn pages(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "url": format!("https://example.com/p{i}"),
                    "metadata": { "title": format!("Page {i}") },
                    "markdown": "# hi"
                })
            })
            .collect()
    }

    #[test]
    fn scraping_report_has_counts_and_wait_instruction_but_no_summary() {
        let raw = json!({
            "status": "scraping",
            "total": 120,
            "completed": 30,
            "data": pages(30)
        });
        let report = summarize("job_1", &raw);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["status"], json!("scraping"));
        assert_eq!(v["total_pages"], json!(120));
        assert_eq!(v["completed_pages"], json!(30));
        assert!(v.get("summary").is_none());
        let msg = v["message"].as_str().unwrap();
        assert!(msg.contains("job_1"));
        assert!(msg.contains("Wait 5-10 seconds"));
    }

    #[test]
    fn failed_report_is_a_value_not_an_error_and_has_no_summary() {
        let raw = json!({ "status": "failed" });
        let report = summarize("job_9", &raw);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["status"], json!("failed"));
        assert_eq!(v["job_id"], json!("job_9"));
        assert!(v.get("summary").is_none());
    }

    #[test]
    fn completed_small_crawl_keeps_every_page_and_never_mentions_truncation() {
        let raw = json!({
            "status": "completed",
            "total": 3,
            "completed": 3,
            "data": pages(3)
        });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["summary"].as_array().unwrap().len(), 3);
        assert_eq!(v["summary"][0]["url"], json!("https://example.com/p0"));
        assert_eq!(v["summary"][0]["title"], json!("Page 0"));
        assert_eq!(v["summary"][0]["has_content"], json!(true));
        assert!(!v["message"].as_str().unwrap().contains("first 50"));
        assert!(v["message"].as_str().unwrap().contains("not included"));
    }

    #[test]
    fn completed_large_crawl_is_capped_at_fifty_in_original_order() {
        let raw = json!({
            "status": "completed",
            "total": 80,
            "completed": 80,
            "data": pages(80)
        });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        let summary = v["summary"].as_array().unwrap();
        assert_eq!(summary.len(), PAGE_SUMMARY_CAP);
        assert_eq!(summary[49]["url"], json!("https://example.com/p49"));
        let msg = v["message"].as_str().unwrap();
        assert!(msg.contains("Showing first 50 URLs"));
        // The message quotes the remote total, not the array length.
        assert!(msg.contains("80 pages"));
    }

    #[test]
    fn page_url_falls_back_through_source_url_to_unknown() {
        let raw = json!({
            "status": "completed",
            "data": [
                { "sourceURL": "https://example.com/src", "html": "<p>x</p>" },
                { "title": "no urls here" }
            ]
        });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["summary"][0]["url"], json!("https://example.com/src"));
        assert_eq!(v["summary"][0]["has_content"], json!(true));
        assert_eq!(v["summary"][1]["url"], json!("unknown"));
        assert_eq!(v["summary"][1]["title"], json!("no urls here"));
        assert_eq!(v["summary"][1]["has_content"], json!(false));
    }

    #[test]
    fn title_prefers_metadata_over_top_level() {
        let raw = json!({
            "status": "completed",
            "data": [{
                "url": "https://example.com/a",
                "title": "top",
                "metadata": { "title": "meta" }
            }]
        });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["summary"][0]["title"], json!("meta"));
    }

    #[test]
    fn completed_counter_defaults_to_page_array_length() {
        let raw = json!({ "status": "completed", "data": pages(4) });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["completed_pages"], json!(4));
        assert_eq!(v["total_pages"], json!(0));
    }

    #[test]
    fn has_more_data_mirrors_next_cursor_even_without_truncation() {
        let raw = json!({
            "status": "completed",
            "data": pages(2),
            "next": "https://api.firecrawl.dev/v2/crawl/job_1?skip=2"
        });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["has_more_data"], json!(true));
        assert_eq!(
            v["next_url"],
            json!("https://api.firecrawl.dev/v2/crawl/job_1?skip=2")
        );

        let raw = json!({ "status": "completed", "data": pages(60), "next": null });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["has_more_data"], json!(false));
        assert!(v["next_url"].is_null());
    }

    #[test]
    fn unrecognized_status_refuses_to_synthesize_a_summary() {
        let raw = json!({ "status": "cancelled", "data": pages(5) });
        let report = summarize("job_1", &raw);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["status"], json!("cancelled"));
        assert!(v.get("summary").is_none());
        assert!(v["message"].as_str().unwrap().contains("cancelled"));
    }

    #[test]
    fn missing_status_is_treated_as_unknown() {
        let raw = json!({ "data": pages(2) });
        let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["status"], json!("unknown"));
        assert!(v.get("summary").is_none());
    }

    proptest! {
        #[test]
        fn summary_length_is_bounded_by_cap_and_page_count(n in 0usize..120) {
            let raw = json!({
                "status": "completed",
                "total": n,
                "completed": n,
                "data": pages(n)
            });
            let v = serde_json::to_value(summarize("job_1", &raw)).unwrap();
            let len = v["summary"].as_array().unwrap().len();
            prop_assert_eq!(len, n.min(PAGE_SUMMARY_CAP));
            let truncated_msg = v["message"].as_str().unwrap().contains("Showing first");
            prop_assert_eq!(truncated_msg, n > PAGE_SUMMARY_CAP);
        }
    }
}
