use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::fmt;

/// Sentinel stored in every market-data field that could not be fetched.
pub const UNAVAILABLE: &str = "N/A";

pub const ELLIPSIS: &str = "...";

/// Text over `limit` characters becomes its first `keep` characters plus `...`.
pub fn truncate_chars(text: &str, limit: usize, keep: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// One market-data figure, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Metric {
    Value(String),
    #[default]
    Unavailable,
}

impl Metric {
    /// Wrap provider text, mapping the provider's own "missing" spellings to `Unavailable`.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match text {
            "" | "-" | "None" | "none" | "null" | UNAVAILABLE => Metric::Unavailable,
            _ => Metric::Value(text.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Value(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Metric::Value(v) => v,
            Metric::Unavailable => UNAVAILABLE,
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Metric::Value(format!("{v:.2}")),
            _ => Metric::Unavailable,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The three markets a report recommends picks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Us,
    Hk,
    Cn,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Us, Market::Hk, Market::Cn];

    /// Display name used in headings and placeholders.
    pub fn label(self) -> &'static str {
        match self {
            Market::Us => "美股",
            Market::Hk => "港股",
            Market::Cn => "A股",
        }
    }

    /// Field name of the pick sequence in the report JSON and the Notion page.
    pub fn field(self) -> &'static str {
        match self {
            Market::Us => "usTop10Stocks",
            Market::Hk => "hkTop10Stocks",
            Market::Cn => "cnTop10Stocks",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall market sentiment. Unrecognized labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Other(String),
}

impl Sentiment {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        match label.to_ascii_lowercase().as_str() {
            "利好" | "positive" | "bullish" => Sentiment::Positive,
            "利空" | "negative" | "bearish" => Sentiment::Negative,
            "中性" | "neutral" => Sentiment::Neutral,
            _ => Sentiment::Other(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Sentiment::Positive => "利好",
            Sentiment::Negative => "利空",
            Sentiment::Neutral => "中性",
            Sentiment::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Live quote and fundamentals attached to a pick by the enricher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub price: Metric,
    pub market_cap: Metric,
    pub pe_ratio: Metric,
    pub ps_ratio: Metric,
    pub pb_ratio: Metric,
    pub roe_ratio: Metric,
    pub weekly_change: Metric,
    pub monthly_change: Metric,
    pub source_link: String,
}

impl MarketData {
    /// Every figure set to the sentinel; only the public quote link survives.
    pub fn unavailable(source_link: String) -> Self {
        Self {
            price: Metric::Unavailable,
            market_cap: Metric::Unavailable,
            pe_ratio: Metric::Unavailable,
            ps_ratio: Metric::Unavailable,
            pb_ratio: Metric::Unavailable,
            roe_ratio: Metric::Unavailable,
            weekly_change: Metric::Unavailable,
            monthly_change: Metric::Unavailable,
            source_link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPick {
    pub stock_code: String,
    pub company_name: String,
    pub reason: String,
    #[serde(flatten)]
    pub market: MarketData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsLink {
    pub title: String,
    pub url: String,
}

/// One allocation line of the suggested portfolio. Ratios are free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPlanItem {
    pub asset_name: String,
    pub asset_type: String,
    pub allocation_ratio: String,
    pub expected_gain: String,
    pub buy_sell_timing: String,
    pub holding_strategy: String,
}

/// The weekly report, built once per run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub overall_sentiment: Sentiment,
    pub overall_summary: String,
    pub daily_commentary: String,
    pub related_news_links: Vec<NewsLink>,
    #[serde(rename = "usTop10Stocks")]
    pub us_picks: Vec<StockPick>,
    #[serde(rename = "hkTop10Stocks")]
    pub hk_picks: Vec<StockPick>,
    #[serde(rename = "cnTop10Stocks")]
    pub cn_picks: Vec<StockPick>,
    #[serde(rename = "investmentPortfolio", skip_serializing_if = "Vec::is_empty")]
    pub investment_plan: Vec<InvestmentPlanItem>,
    pub generated_at: DateTime<Local>,
}

impl Report {
    pub fn picks(&self, market: Market) -> &[StockPick] {
        match market {
            Market::Us => &self.us_picks,
            Market::Hk => &self.hk_picks,
            Market::Cn => &self.cn_picks,
        }
    }

    pub fn picks_mut(&mut self, market: Market) -> &mut Vec<StockPick> {
        match market {
            Market::Us => &mut self.us_picks,
            Market::Hk => &mut self.hk_picks,
            Market::Cn => &mut self.cn_picks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("短文本", 200, 197), "短文本");
        let cut = truncate_chars(&"长".repeat(250), 200, 197);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("长..."));
        assert_eq!(truncate_chars(&"a".repeat(200), 200, 197).len(), 200);
    }

    #[test]
    fn test_sentiment_vocabulary() {
        assert_eq!(Sentiment::parse("利好"), Sentiment::Positive);
        assert_eq!(Sentiment::parse(" Bearish "), Sentiment::Negative);
        assert_eq!(Sentiment::parse("中性"), Sentiment::Neutral);
        assert_eq!(Sentiment::parse("震荡"), Sentiment::Other("震荡".into()));
        assert_eq!(Sentiment::parse("neutral").label(), "中性");
    }

    #[test]
    fn test_metric_from_provider_text() {
        assert_eq!(Metric::from_text("None"), Metric::Unavailable);
        assert_eq!(Metric::from_text("  "), Metric::Unavailable);
        assert_eq!(Metric::from_text("28.5"), Metric::Value("28.5".into()));
        assert_eq!(Metric::from(Some(1.234)), Metric::Value("1.23".into()));
        assert_eq!(Metric::from(Some(f64::NAN)), Metric::Unavailable);
        assert_eq!(Metric::Unavailable.to_string(), UNAVAILABLE);
    }

    #[test]
    fn test_pick_serializes_flat_with_sentinels() {
        let pick = StockPick {
            stock_code: "AAPL".into(),
            company_name: "苹果公司".into(),
            reason: "r".into(),
            market: MarketData::unavailable("https://finance.yahoo.com/quote/AAPL".into()),
        };
        let v = serde_json::to_value(&pick).unwrap();
        assert_eq!(v["stockCode"], "AAPL");
        assert_eq!(v["price"], UNAVAILABLE);
        assert_eq!(v["monthlyChange"], UNAVAILABLE);
        assert_eq!(v["sourceLink"], "https://finance.yahoo.com/quote/AAPL");
    }
}
