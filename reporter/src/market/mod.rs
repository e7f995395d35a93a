pub mod alpha_vantage;
pub mod enrich;
pub mod throttle;
pub mod tushare;

use crate::error::MarketDataError;
use async_trait::async_trait;

pub use alpha_vantage::{AlphaVantageClient, CompanyOverview, GlobalQuote};
pub use enrich::{EnrichStats, Enricher};
pub use throttle::Throttle;
pub use tushare::{DailyBasic, TushareClient};

/// Quote + fundamentals provider for US tickers.
#[async_trait]
pub trait UsMarketSource: Send + Sync {
    async fn global_quote(&self, symbol: &str) -> Result<GlobalQuote, MarketDataError>;
    async fn overview(&self, symbol: &str) -> Result<CompanyOverview, MarketDataError>;
}

/// Daily-basis provider shared by Hong Kong and mainland tickers.
#[async_trait]
pub trait DailyBasicSource: Send + Sync {
    async fn daily_basic(&self, ts_code: &str) -> Result<DailyBasic, MarketDataError>;
}

/// Ticker as the public quote page expects it.
/// Hong Kong codes shorter than four digits are zero-padded (`700.HK` -> `0700.HK`).
pub fn yahoo_symbol(code: &str) -> String {
    let code = code.trim();
    let upper = code.to_ascii_uppercase();
    if let Some(digits) = upper.strip_suffix(".HK") {
        if digits.len() < 4 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return format!("{digits:0>4}.HK");
        }
    }
    code.to_string()
}

/// Public quote page for a ticker; used whenever live data is missing.
pub fn quote_page_link(code: &str) -> String {
    format!("https://finance.yahoo.com/quote/{}", yahoo_symbol(code))
}

/// Currency of a Hong Kong or mainland listing, from its exchange suffix.
pub fn listing_currency(code: &str) -> &'static str {
    let upper = code.trim().to_ascii_uppercase();
    if upper.ends_with(".SH") || upper.ends_with(".SZ") {
        "CNY"
    } else {
        "HKD"
    }
}
