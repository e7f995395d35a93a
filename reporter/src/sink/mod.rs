pub mod firestore;
pub mod notion;

use crate::error::ReportError;
use crate::render::PageDraft;
use crate::types::Report;
use async_trait::async_trait;
use std::fmt;

pub use firestore::FirestoreClient;
pub use notion::NotionClient;

/// Stores the latest report as a single overwritable document.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn write_latest(&self, report: &Report) -> Result<(), ReportError>;
}

/// Appends one wiki page per report.
#[async_trait]
pub trait PageSink: Send + Sync {
    async fn create_page(&self, draft: &PageDraft) -> Result<(), ReportError>;
}

/// What happened to one sink during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkStatus {
    Written,
    Skipped,
    Failed(String),
}

impl SinkStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SinkStatus::Failed(_))
    }
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkStatus::Written => f.write_str("written"),
            SinkStatus::Skipped => f.write_str("skipped"),
            SinkStatus::Failed(e) => write!(f, "failed ({e})"),
        }
    }
}
