use crate::error::ReportError;
use crate::market::quote_page_link;
use crate::report::extract_json;
use crate::types::{
    truncate_chars, InvestmentPlanItem, MarketData, NewsLink, Report, Sentiment, StockPick,
    ELLIPSIS, UNAVAILABLE,
};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Upper bound on a pick's justification, in characters, ellipsis included.
const MAX_REASON_CHARS: usize = 200;
const REASON_KEEP_CHARS: usize = MAX_REASON_CHARS - ELLIPSIS.len();

/// A text field as the model actually returns it. Strings are the contract, but
/// numbers, keyed objects and lists all show up in practice.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientText {
    Text(String),
    Number(serde_json::Number),
    Keyed(Map<String, Value>),
    List(Vec<Value>),
    Other(IgnoredAny),
}

impl LenientText {
    fn into_text(self) -> Option<String> {
        match self {
            LenientText::Text(s) => Some(s),
            LenientText::Number(n) => Some(n.to_string()),
            LenientText::Keyed(map) => Some(flatten_keyed(&map)),
            LenientText::List(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            LenientText::Other(_) => None,
        }
    }
}

/// `key: value` for every string-valued entry, blank-line separated, in map order.
fn flatten_keyed(map: &Map<String, Value>) -> String {
    map.iter()
        .filter_map(|(key, value)| value.as_str().map(|v| format!("{key}: {v}")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    overall_sentiment: Option<LenientText>,
    overall_summary: Option<LenientText>,
    daily_commentary: Option<LenientText>,
    related_news_links: Option<Value>,
    us_top10_stocks: Option<Value>,
    hk_top10_stocks: Option<Value>,
    cn_top10_stocks: Option<Value>,
    investment_portfolio: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPick {
    stock_code: Option<LenientText>,
    company_name: Option<LenientText>,
    reason: Option<LenientText>,
}

#[derive(Debug, Deserialize)]
struct RawNewsLink {
    title: Option<LenientText>,
    url: Option<LenientText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlanItem {
    asset_name: Option<LenientText>,
    asset_type: Option<LenientText>,
    allocation_ratio: Option<LenientText>,
    expected_gain: Option<LenientText>,
    buy_sell_timing: Option<LenientText>,
    holding_strategy: Option<LenientText>,
}

fn text(field: Option<LenientText>) -> Option<String> {
    field
        .and_then(LenientText::into_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn text_or_na(field: Option<LenientText>) -> String {
    text(field).unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Deserialize each element of a JSON array on its own, skipping the ones that
/// do not fit instead of failing the whole report.
fn items<T: DeserializeOwned>(field: &str, value: Option<Value>) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("{field}: expected a list, got {}; treating as empty", type_name(&other));
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("{field}[{i}] skipped: {e}");
                None
            }
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn picks(field: &str, value: Option<Value>) -> Vec<StockPick> {
    items::<RawPick>(field, value)
        .into_iter()
        .filter_map(|raw| {
            let Some(code) = text(raw.stock_code) else {
                warn!("{field}: dropping pick without a stock code");
                return None;
            };
            let reason = truncate_chars(&text_or_na(raw.reason), MAX_REASON_CHARS, REASON_KEEP_CHARS);
            Some(StockPick {
                market: MarketData::unavailable(quote_page_link(&code)),
                stock_code: code,
                company_name: text_or_na(raw.company_name),
                reason,
            })
        })
        .collect()
}

/// Label put in front of the summary, e.g. `过去一周（2024年05月14日-20日）：`.
pub fn week_range_label(today: NaiveDate) -> String {
    let start = today - Days::new(6);
    let end = if start.year() != today.year() {
        today.format("%Y年%m月%d日")
    } else if start.month() != today.month() {
        today.format("%m月%d日")
    } else {
        today.format("%d日")
    };
    format!("过去一周（{}-{}）：\n\n", start.format("%Y年%m月%d日"), end)
}

/// Parse the AI reply into a fully populated [`Report`].
///
/// Every missing field becomes `N/A`; only an unparsable payload is an error.
pub fn normalize(reply: &str, now: DateTime<Local>) -> Result<Report, ReportError> {
    let json = extract_json(reply)?;

    let schema_err = |message: String| ReportError::Schema {
        message,
        raw: reply.to_string(),
    };

    let value: Value = serde_json::from_str(json).map_err(|e| schema_err(e.to_string()))?;
    if !value.is_object() {
        return Err(schema_err(format!("top-level JSON is {}", type_name(&value))));
    }
    let raw: RawReport =
        serde_json::from_value(value).map_err(|e| schema_err(e.to_string()))?;

    let sentiment = Sentiment::parse(&text_or_na(raw.overall_sentiment));
    let summary = format!(
        "{}{}",
        week_range_label(now.date_naive()),
        text_or_na(raw.overall_summary)
    );

    let related_news_links = items::<RawNewsLink>("relatedNewsLinks", raw.related_news_links)
        .into_iter()
        .map(|link| NewsLink {
            title: text_or_na(link.title),
            url: text_or_na(link.url),
        })
        .collect();

    let investment_plan = items::<RawPlanItem>("investmentPortfolio", raw.investment_portfolio)
        .into_iter()
        .map(|item| InvestmentPlanItem {
            asset_name: text_or_na(item.asset_name),
            asset_type: text_or_na(item.asset_type),
            allocation_ratio: text_or_na(item.allocation_ratio),
            expected_gain: text_or_na(item.expected_gain),
            buy_sell_timing: text_or_na(item.buy_sell_timing),
            holding_strategy: text_or_na(item.holding_strategy),
        })
        .collect();

    let report = Report {
        overall_sentiment: sentiment,
        overall_summary: summary,
        daily_commentary: text_or_na(raw.daily_commentary),
        related_news_links,
        us_picks: picks("usTop10Stocks", raw.us_top10_stocks),
        hk_picks: picks("hkTop10Stocks", raw.hk_top10_stocks),
        cn_picks: picks("cnTop10Stocks", raw.cn_top10_stocks),
        investment_plan,
        generated_at: now,
    };

    info!(
        "Parsed report: sentiment={} picks us={} hk={} cn={} news={} plan={}",
        report.overall_sentiment,
        report.us_picks.len(),
        report.hk_picks.len(),
        report.cn_picks.len(),
        report.related_news_links.len(),
        report.investment_plan.len(),
    );
    Ok(report)
}
