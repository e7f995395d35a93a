mod analyzer;
mod config;
mod email;
mod error;
mod market;
mod pipeline;
mod render;
mod report;
mod sink;
mod types;

use crate::analyzer::{GeminiClient, ReplayModel, ReportModel};
use crate::config::Config;
use crate::email::Mailer;
use crate::market::{
    AlphaVantageClient, DailyBasicSource, Enricher, Throttle, TushareClient, UsMarketSource,
};
use crate::pipeline::{prepare, run, RunOutcome, Services};
use crate::render::render_html;
use crate::sink::{DocumentSink, FirestoreClient, NotionClient, PageSink};
use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "finreport", about = "Weekly AI finance report with live quotes, delivered to Notion, Firestore and email")]
struct Cli {
    /// Load config from a specific .env file
    #[arg(long)]
    config_file: Option<String>,

    /// Read the AI reply from this file instead of calling the model
    #[arg(long)]
    replay: Option<String>,

    /// Build and render the report, write the HTML locally, skip every sink
    #[arg(long)]
    dry_run: bool,

    /// Where --dry-run writes the rendered HTML
    #[arg(long, default_value = "report.html")]
    html_out: String,
}

fn firestore_client(cfg: &Config) -> Option<FirestoreClient> {
    if cfg.firebase_config_json.is_empty() {
        info!("FIREBASE_CONFIG_JSON not set, Firestore disabled");
        return None;
    }
    if cfg.firestore_access_token.is_empty() {
        warn!("FIRESTORE_ACCESS_TOKEN not set, Firestore disabled");
        return None;
    }
    match FirestoreClient::from_service_account(
        &cfg.firebase_config_json,
        &cfg.app_id,
        &cfg.firestore_access_token,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("{e}, Firestore disabled");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    // Every exit path returns Ok: a failed run is reported by log and mail.
    let cfg = match Config::from_env_file(cli.config_file.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {e:#}");
            return Ok(());
        }
    };

    info!("══════════════════════════════════════════════════════");
    info!("  FINANCE WEEKLY REPORT v{}", env!("CARGO_PKG_VERSION"));
    info!("  Mode: {}", if cli.dry_run { "DRY RUN (no sinks)" } else { "PUBLISH" });
    info!("  AI: {}", match cli.replay.as_deref() {
        Some(path) => format!("replay from {path}"),
        None => format!("{} (search: {})", cfg.gemini_model, cfg.gemini_search),
    });
    info!("  Recipients: {} | Plan: {}", cfg.recipients.len(), cfg.include_investment_plan);
    info!("══════════════════════════════════════════════════════");

    let model: Box<dyn ReportModel> = match cli.replay.as_deref() {
        Some(path) => Box::new(ReplayModel::new(path)),
        None => {
            let gemini = GeminiClient::new(&cfg.gemini_api_key, &cfg.gemini_model, cfg.gemini_search);
            if !gemini.is_configured() {
                error!("GEMINI_API_KEY must be set");
                return Ok(());
            }
            Box::new(gemini)
        }
    };

    let alpha_vantage = AlphaVantageClient::new(&cfg.alpha_vantage_api_key);
    let us: Option<Box<dyn UsMarketSource>> = if alpha_vantage.is_configured() {
        Some(Box::new(alpha_vantage))
    } else {
        warn!("ALPHA_VANTAGE_API_KEY not set, US picks keep N/A market data");
        None
    };
    let tushare = TushareClient::new(&cfg.tushare_api_key, &cfg.tushare_api_url);
    let daily: Option<Box<dyn DailyBasicSource>> = if tushare.is_configured() {
        Some(Box::new(tushare))
    } else {
        warn!("TUSHARE_API_KEY not set, HK/CN picks keep N/A market data");
        None
    };
    let enricher = Enricher::new(
        us,
        daily,
        Throttle::new(Duration::from_secs(cfg.alpha_vantage_min_interval_secs)),
    );

    let mailer = Mailer::new(
        &cfg.smtp_host,
        cfg.smtp_port,
        &cfg.smtp_user,
        &cfg.smtp_pass,
        &cfg.mail_from,
    );
    if mailer.is_configured() {
        info!("Email configured -> {} recipient(s)", cfg.recipients.len());
    } else {
        warn!("Email NOT configured (set SMTP_* env vars)");
    }

    let notion = NotionClient::new(&cfg.notion_token, &cfg.notion_database_id, &cfg.notion_report_url);
    let pages: Option<&dyn PageSink> = if notion.is_configured() {
        Some(&notion)
    } else {
        info!("Notion credentials not set, page sink disabled");
        None
    };
    let firestore = firestore_client(&cfg);
    let documents: Option<&dyn DocumentSink> = firestore.as_ref().map(|c| c as &dyn DocumentSink);

    let services = Services {
        model: model.as_ref(),
        enricher: &enricher,
        documents,
        pages,
        mail: &mailer,
        recipients: &cfg.recipients,
    };
    let now = Local::now();

    if cli.dry_run {
        match prepare(&services, cfg.include_investment_plan, now).await {
            Ok((report, stats)) => {
                let html = render_html(&report);
                match tokio::fs::write(&cli.html_out, html).await {
                    Ok(()) => info!("Dry run: report written to {} ({stats:?})", cli.html_out),
                    Err(e) => error!("Dry run: cannot write {}: {e}", cli.html_out),
                }
            }
            Err(failure) => error!("Dry run failed: {}", failure.detail()),
        }
        return Ok(());
    }

    match run(&services, cfg.include_investment_plan, now).await {
        RunOutcome::Published(publication) => {
            let stats = publication.enrichment;
            info!(
                "Report \"{}\" ({}): {} enriched, {} degraded, {} skipped",
                publication.subject,
                publication.report.overall_sentiment,
                stats.enriched,
                stats.degraded,
                stats.skipped
            );
            if publication.pages.is_failed()
                || publication.documents.is_failed()
                || !publication.mail.all_sent()
            {
                warn!(
                    "Run finished with failures: notion={}, firestore={}, mail failed for {:?}",
                    publication.pages, publication.documents, publication.mail.failed
                );
            } else {
                info!("Run finished: notion={}, firestore={}", publication.pages, publication.documents);
            }
        }
        RunOutcome::Aborted { failure, alert } => error!(
            "Report aborted: {} (failure notice sent to {} recipient(s))",
            failure.error,
            alert.sent.len()
        ),
    }

    Ok(())
}
