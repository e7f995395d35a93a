//! Projections of a finished [`Report`](crate::types::Report) for each sink.

pub mod compact;
pub mod html;

use crate::types::Metric;
use chrono::{DateTime, Local};

pub use compact::{page_draft, PageDraft};
pub use html::{render_html, render_notice};

pub const REPORT_NAME: &str = "【理财分析】每周理财分析报告";

/// Page title and mail subject, e.g. `【理财分析】每周理财分析报告 - 2024-05-20`.
pub fn report_title(at: DateTime<Local>) -> String {
    format!("{REPORT_NAME} - {}", at.format("%Y-%m-%d"))
}

/// A change figure with its percent sign, or the bare sentinel.
pub fn percent(metric: &Metric) -> String {
    match metric {
        Metric::Value(v) => format!("{v}%"),
        Metric::Unavailable => metric.to_string(),
    }
}
