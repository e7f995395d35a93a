use crate::error::MarketDataError;
use crate::market::UsMarketSource;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage client for US quotes (`GLOBAL_QUOTE`) and fundamentals (`OVERVIEW`).
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

/// Latest quote, as provider text.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalQuote {
    pub price: String,
    pub change_percent: String,
}

/// The subset of `OVERVIEW` the report shows. Alpha Vantage sends every figure as a string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyOverview {
    #[serde(rename = "MarketCapitalization")]
    pub market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "PriceToSalesRatioTTM")]
    pub price_to_sales_ttm: Option<String>,
    #[serde(rename = "ReturnOnEquityTTM")]
    pub return_on_equity_ttm: Option<String>,
    #[serde(rename = "PriceToBookRatio")]
    pub price_to_book: Option<String>,
}

impl AlphaVantageClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()
                .expect("HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn query(&self, function: &str, symbol: &str) -> Result<Value, MarketDataError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            // the query string carries the key
            .map_err(|e| MarketDataError::Network(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!(
                "Alpha Vantage {function} {}",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.without_url().to_string()))?;
        check_notices(&body)?;
        debug!("Alpha Vantage {function} {symbol}: ok");
        Ok(body)
    }
}

/// Alpha Vantage answers 200 OK with a `Note`/`Information` body when throttled.
fn check_notices(body: &Value) -> Result<(), MarketDataError> {
    for key in ["Note", "Information"] {
        if let Some(note) = body.get(key).and_then(Value::as_str) {
            return Err(MarketDataError::RateLimited(note.chars().take(120).collect()));
        }
    }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(MarketDataError::BadResponse(msg.to_string()));
    }
    Ok(())
}

fn parse_global_quote(symbol: &str, body: &Value) -> Result<GlobalQuote, MarketDataError> {
    let quote = body
        .get("Global Quote")
        .and_then(Value::as_object)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| MarketDataError::Empty(symbol.to_string()))?;

    let field = |name: &str| {
        quote
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let price = field("05. price");
    if price.is_empty() {
        return Err(MarketDataError::Empty(symbol.to_string()));
    }
    Ok(GlobalQuote {
        price,
        change_percent: field("10. change percent"),
    })
}

fn parse_overview(symbol: &str, body: Value) -> Result<CompanyOverview, MarketDataError> {
    if body.as_object().map_or(true, |o| o.is_empty()) {
        return Err(MarketDataError::Empty(symbol.to_string()));
    }
    serde_json::from_value(body).map_err(|e| MarketDataError::Parse(e.to_string()))
}

#[async_trait]
impl UsMarketSource for AlphaVantageClient {
    async fn global_quote(&self, symbol: &str) -> Result<GlobalQuote, MarketDataError> {
        let body = self.query("GLOBAL_QUOTE", symbol).await?;
        parse_global_quote(symbol, &body)
    }

    async fn overview(&self, symbol: &str) -> Result<CompanyOverview, MarketDataError> {
        let body = self.query("OVERVIEW", symbol).await?;
        parse_overview(symbol, body)
    }
}

/// Link to the provider's fundamentals page, without the API key.
pub fn overview_link(symbol: &str) -> String {
    format!("{BASE_URL}?function=OVERVIEW&symbol={symbol}")
}
