use thiserror::Error;

/// Failure kinds of a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// AI provider (or other upstream service) failed to answer.
    #[error("{service} call failed: {message}")]
    UpstreamCall {
        service: &'static str,
        message: String,
    },

    /// No JSON object could be isolated from the AI reply.
    #[error("JSON extraction failed: {0}")]
    Extraction(String),

    /// The isolated text was not parsable as the expected report object.
    /// `raw` is the full AI reply, kept for the failure email.
    #[error("report schema error: {message}")]
    Schema { message: String, raw: String },

    #[error("{sink} write failed: {message}")]
    SinkWrite {
        sink: &'static str,
        message: String,
    },

    #[error("mail to {recipient} failed: {message}")]
    SinkSend { recipient: String, message: String },
}

impl ReportError {
    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::UpstreamCall {
            service,
            message: err.to_string(),
        }
    }

    pub fn sink_write(sink: &'static str, err: impl std::fmt::Display) -> Self {
        Self::SinkWrite {
            sink,
            message: err.to_string(),
        }
    }
}

/// Market-data provider failures. Every variant degrades a single pick;
/// none of them reaches the caller of the enricher.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider account lacks the points/permission for this endpoint.
    #[error("insufficient API privilege: {0}")]
    InsufficientPrivilege(String),

    #[error("no data for {0}")]
    Empty(String),
}
