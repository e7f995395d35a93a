use crate::error::ReportError;
use crate::render::PageDraft;
use crate::sink::PageSink;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

const SINK: &str = "Notion";
const PAGES_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionClient {
    token: String,
    database_id: String,
    report_url: String,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(token: &str, database_id: &str, report_url: &str) -> Self {
        Self {
            token: token.to_string(),
            database_id: database_id.to_string(),
            report_url: report_url.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.database_id.is_empty()
    }
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

/// Request body for `POST /v1/pages`, one new page in the report database.
pub fn page_body(draft: &PageDraft, database_id: &str, report_url: &str) -> Value {
    let mut props = Map::new();
    props.insert(
        "Title".into(),
        json!({ "title": [{ "text": { "content": draft.title } }] }),
    );
    props.insert("URL".into(), json!({ "url": report_url }));
    props.insert(
        "OverallSentiment".into(),
        json!({ "select": { "name": draft.sentiment } }),
    );
    props.insert("OverallSummary".into(), rich_text(&draft.summary));
    props.insert("DailyCommentary".into(), rich_text(&draft.commentary));
    for (market, text) in &draft.picks {
        props.insert(market.field().into(), rich_text(text));
    }
    props.insert(
        "CrawledDate".into(),
        json!({ "date": { "start": draft.crawled_at.to_rfc3339() } }),
    );

    json!({
        "parent": { "database_id": database_id },
        "properties": props,
    })
}

#[async_trait]
impl PageSink for NotionClient {
    async fn create_page(&self, draft: &PageDraft) -> Result<(), ReportError> {
        let body = page_body(draft, &self.database_id, &self.report_url);

        let resp = self
            .client
            .post(PAGES_URL)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::sink_write(SINK, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            return Err(ReportError::sink_write(SINK, format!("{status}: {snippet}")));
        }

        info!("Notion page created: {}", draft.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Market;
    use chrono::{Local, TimeZone};

    fn draft() -> PageDraft {
        PageDraft {
            title: "【理财分析】每周理财分析报告 - 2024-05-20".into(),
            sentiment: "利好".into(),
            summary: "摘要".into(),
            commentary: "点评".into(),
            picks: vec![
                (Market::Us, "暂无美股推荐。".into()),
                (Market::Hk, "[1. 腾讯控股 (700.HK): 龙头]".into()),
                (Market::Cn, "暂无A股推荐。".into()),
            ],
            crawled_at: Local.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_page_properties() {
        let body = page_body(&draft(), "db-1", "https://example.com/finance-report");
        let props = &body["properties"];
        assert_eq!(body["parent"]["database_id"], "db-1");
        assert_eq!(props["Title"]["title"][0]["text"]["content"], "【理财分析】每周理财分析报告 - 2024-05-20");
        assert_eq!(props["URL"]["url"], "https://example.com/finance-report");
        assert_eq!(props["OverallSentiment"]["select"]["name"], "利好");
        assert_eq!(
            props["hkTop10Stocks"]["rich_text"][0]["text"]["content"],
            "[1. 腾讯控股 (700.HK): 龙头]"
        );
        assert!(props["CrawledDate"]["date"]["start"]
            .as_str()
            .unwrap()
            .starts_with("2024-05-20T09:30:00"));
    }

    #[test]
    fn test_configured_needs_both_keys() {
        assert!(!NotionClient::new("tok", "", "u").is_configured());
        assert!(NotionClient::new("tok", "db", "u").is_configured());
    }
}
