use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    InvalidUrl,
    NotConfigured,
    CrawlRequestFailed,
    UnexpectedError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidUrl => "invalid_url",
            Self::NotConfigured => "not_configured",
            Self::CrawlRequestFailed => "crawl_request_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            // Transport/HTTP failures may be transient; the orchestrator owns retries.
            Self::CrawlRequestFailed => true,
            // Configuration + invalid input are not retryable without changing something.
            Self::InvalidParams | Self::InvalidUrl | Self::NotConfigured | Self::UnexpectedError => {
                false
            }
        }
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(super::SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": code.retryable()
        }),
    }
}

/// Map a client-layer error to the stable wire error object. Remote failures
/// keep the HTTP status and the parsed remote body.
pub(crate) fn error_value(err: &firepoll_core::Error) -> serde_json::Value {
    use firepoll_core::Error;
    match err {
        Error::InvalidUrl(_) => error_obj(
            ErrorCode::InvalidUrl,
            err,
            "Provide a full http:// or https:// URL.",
        ),
        Error::InvalidParams(_) => error_obj(
            ErrorCode::InvalidParams,
            err,
            "Check the tool's parameter list and try again.",
        ),
        Error::NotConfigured(_) => error_obj(
            ErrorCode::NotConfigured,
            err,
            "Set FIREPOLL_FIRECRAWL_API_KEY (or FIRECRAWL_API_KEY) in the server environment.",
        ),
        Error::Remote {
            status,
            body,
            context,
        } => {
            let mut v = error_obj(
                ErrorCode::CrawlRequestFailed,
                context,
                "The crawl API rejected the request or was unreachable. Retry, or check the remote error body.",
            );
            v["status"] = serde_json::json!(status);
            v["remote_body"] = body.clone().unwrap_or(serde_json::Value::Null);
            v
        }
        Error::Orchestrator(_) => error_obj(
            ErrorCode::UnexpectedError,
            err,
            "Internal failure; see server logs.",
        ),
    }
}
