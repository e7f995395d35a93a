use crate::analyzer::{prompt, ReportModel};
use crate::email::{deliver, send_alert, Delivery, MailSink};
use crate::error::ReportError;
use crate::market::{EnrichStats, Enricher};
use crate::render::{page_draft, render_html, report_title};
use crate::report::normalize;
use crate::sink::{DocumentSink, PageSink, SinkStatus};
use crate::types::Report;
use chrono::{DateTime, Local};
use tracing::{error, info, warn};

pub const FAILURE_SUBJECT: &str = "理财分析任务失败";
pub const PARTIAL_FAILURE_SUBJECT: &str = "理财分析任务部分失败";

/// External collaborators of one run.
pub struct Services<'a> {
    pub model: &'a dyn ReportModel,
    pub enricher: &'a Enricher,
    pub documents: Option<&'a dyn DocumentSink>,
    pub pages: Option<&'a dyn PageSink>,
    pub mail: &'a dyn MailSink,
    pub recipients: &'a [String],
}

/// A run that stopped before any sink was touched.
#[derive(Debug)]
pub struct Failure {
    pub error: ReportError,
    /// Full AI reply, when one was received.
    pub raw_reply: Option<String>,
}

impl Failure {
    /// Body of the failure notice.
    pub fn detail(&self) -> String {
        match &self.raw_reply {
            Some(raw) => format!("{}\n\n原始响应:\n{raw}", self.error),
            None => self.error.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Publication {
    pub report: Report,
    pub enrichment: EnrichStats,
    pub documents: SinkStatus,
    pub pages: SinkStatus,
    pub subject: String,
    pub mail: Delivery,
}

#[derive(Debug)]
pub enum RunOutcome {
    Aborted { failure: Failure, alert: Delivery },
    Published(Publication),
}

/// AI call, normalization and enrichment.
pub async fn prepare(
    services: &Services<'_>,
    include_plan: bool,
    now: DateTime<Local>,
) -> Result<(Report, EnrichStats), Failure> {
    let reply = services
        .model
        .complete(prompt::SYSTEM, &prompt::user_message(include_plan))
        .await
        .map_err(|e| Failure {
            error: ReportError::upstream("Gemini", format!("{e:#}")),
            raw_reply: None,
        })?;

    let mut report = normalize(&reply, now).map_err(|error| Failure {
        error,
        raw_reply: Some(reply.clone()),
    })?;

    let stats = services.enricher.enrich(&mut report).await;
    Ok((report, stats))
}

async fn write_status<F>(name: &str, write: Option<F>) -> SinkStatus
where
    F: std::future::Future<Output = Result<(), ReportError>>,
{
    let Some(write) = write else {
        info!("{name} not configured, skipping");
        return SinkStatus::Skipped;
    };
    match write.await {
        Ok(()) => SinkStatus::Written,
        Err(e) => {
            error!("{e}");
            SinkStatus::Failed(e.to_string())
        }
    }
}

/// Write every sink, then mail either the report or the partial-failure notice.
pub async fn publish(services: &Services<'_>, report: Report, enrichment: EnrichStats) -> Publication {
    let draft = page_draft(&report);
    let pages = write_status("Notion", services.pages.map(|sink| sink.create_page(&draft))).await;
    let documents = write_status(
        "Firestore",
        services.documents.map(|sink| sink.write_latest(&report)),
    )
    .await;

    let (subject, mail) = if let SinkStatus::Failed(reason) = &pages {
        warn!("Notion write failed, sending partial-failure notice instead of the report");
        let detail = format!("报告已生成，但写入 Notion 失败: {reason}");
        let mail = send_alert(services.mail, services.recipients, PARTIAL_FAILURE_SUBJECT, &detail).await;
        (PARTIAL_FAILURE_SUBJECT.to_string(), mail)
    } else {
        let subject = report_title(report.generated_at);
        let html = render_html(&report);
        let mail = deliver(services.mail, services.recipients, &subject, &html).await;
        (subject, mail)
    };

    info!(
        "Sinks: notion={pages}, firestore={documents}, mail sent={} failed={}",
        mail.sent.len(),
        mail.failed.len()
    );

    Publication {
        report,
        enrichment,
        documents,
        pages,
        subject,
        mail,
    }
}

pub async fn run(services: &Services<'_>, include_plan: bool, now: DateTime<Local>) -> RunOutcome {
    match prepare(services, include_plan, now).await {
        Ok((report, stats)) => RunOutcome::Published(publish(services, report, stats).await),
        Err(failure) => {
            error!("Run aborted: {}", failure.error);
            let alert = send_alert(services.mail, services.recipients, FAILURE_SUBJECT, &failure.detail()).await;
            RunOutcome::Aborted { failure, alert }
        }
    }
}
