use crate::error::MarketDataError;
use crate::market::DailyBasicSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Tushare answers with this code when the account lacks points for an endpoint.
const PRIVILEGE_DENIED: i64 = 40203;
const DAILY_BASIC_FIELDS: &str = "ts_code,trade_date,close,pe_ttm,pb,total_mv,change_pct";

/// Tushare Pro client for the `daily_basic` endpoint (HK and mainland listings).
pub struct TushareClient {
    token: String,
    api_url: String,
    client: reqwest::Client,
}

/// One daily-basis row. `total_mv` is in units of 10,000 CNY.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyBasic {
    pub trade_date: Option<String>,
    pub close: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub total_mv: Option<f64>,
    pub change_pct: Option<f64>,
}

#[derive(Serialize)]
struct TushareRequest<'a> {
    api_name: &'a str,
    token: &'a str,
    params: Value,
    fields: &'a str,
}

#[derive(Deserialize)]
struct TushareResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<TushareTable>,
}

#[derive(Deserialize)]
struct TushareTable {
    fields: Vec<String>,
    items: Vec<Vec<Value>>,
}

impl TushareClient {
    pub fn new(token: &str, api_url: &str) -> Self {
        Self {
            token: token.to_string(),
            api_url: api_url.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()
                .expect("HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

#[async_trait]
impl DailyBasicSource for TushareClient {
    async fn daily_basic(&self, ts_code: &str) -> Result<DailyBasic, MarketDataError> {
        let req = TushareRequest {
            api_name: "daily_basic",
            token: &self.token,
            params: json!({ "ts_code": ts_code }),
            fields: DAILY_BASIC_FIELDS,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .json(&req)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!(
                "Tushare daily_basic {}",
                resp.status()
            )));
        }

        let body: TushareResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;
        debug!("Tushare daily_basic {ts_code}: code={}", body.code);
        parse_daily_basic(ts_code, body)
    }
}

fn parse_daily_basic(ts_code: &str, body: TushareResponse) -> Result<DailyBasic, MarketDataError> {
    let msg = body.msg.unwrap_or_default();
    if body.code == PRIVILEGE_DENIED || msg.contains("权限") {
        return Err(MarketDataError::InsufficientPrivilege(msg));
    }
    if body.code != 0 {
        return Err(MarketDataError::BadResponse(format!("code {}: {msg}", body.code)));
    }

    let table = body
        .data
        .ok_or_else(|| MarketDataError::Empty(ts_code.to_string()))?;
    let column = |name: &str| table.fields.iter().position(|f| f == name);
    let (date_col, close_col, pe_col, pb_col, mv_col, chg_col) = (
        column("trade_date"),
        column("close"),
        column("pe_ttm"),
        column("pb"),
        column("total_mv"),
        column("change_pct"),
    );

    let cell = |row: &[Value], col: Option<usize>| col.and_then(|c| row.get(c)).cloned();
    let number = |row: &[Value], col: Option<usize>| cell(row, col).and_then(|v| v.as_f64());

    // Latest trading day wins regardless of row order.
    let row = table
        .items
        .iter()
        .max_by(|a, b| {
            let date = |row: &[Value]| {
                cell(row, date_col)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            };
            date(a).cmp(&date(b))
        })
        .ok_or_else(|| MarketDataError::Empty(ts_code.to_string()))?;

    Ok(DailyBasic {
        trade_date: cell(row, date_col).and_then(|v| v.as_str().map(str::to_string)),
        close: number(row, close_col),
        pe_ttm: number(row, pe_col),
        pb: number(row, pb_col),
        total_mv: number(row, mv_col),
        change_pct: number(row, chg_col),
    })
}
