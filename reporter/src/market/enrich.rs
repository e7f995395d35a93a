use crate::error::MarketDataError;
use crate::market::alpha_vantage::overview_link;
use crate::market::{listing_currency, quote_page_link, DailyBasicSource, Throttle, UsMarketSource};
use crate::types::{Market, MarketData, Metric, Report, StockPick};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::{info, warn};

/// Per-run enrichment counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub enriched: usize,
    pub degraded: usize,
    pub skipped: usize,
}

/// Attaches live quotes and fundamentals to every pick of a report.
///
/// Never fails: a missing provider skips its market, a failed fetch degrades
/// only that pick to the `N/A` sentinel.
pub struct Enricher {
    us: Option<Box<dyn UsMarketSource>>,
    daily: Option<Box<dyn DailyBasicSource>>,
    us_throttle: Throttle,
}

impl Enricher {
    pub fn new(
        us: Option<Box<dyn UsMarketSource>>,
        daily: Option<Box<dyn DailyBasicSource>>,
        us_throttle: Throttle,
    ) -> Self {
        Self {
            us,
            daily,
            us_throttle,
        }
    }

    pub async fn enrich(&self, report: &mut Report) -> EnrichStats {
        let mut stats = EnrichStats::default();
        for market in Market::ALL {
            let picks = report.picks_mut(market);
            if picks.is_empty() {
                continue;
            }

            let configured = match market {
                Market::Us => self.us.is_some(),
                Market::Hk | Market::Cn => self.daily.is_some(),
            };
            if !configured {
                info!("{market}: no market-data key configured, skipping {} picks", picks.len());
                for pick in picks.iter_mut() {
                    degrade(pick);
                }
                stats.skipped += picks.len();
                continue;
            }

            info!("{market}: enriching {} picks", picks.len());
            for pick in picks.iter_mut() {
                let fetched = match market {
                    Market::Us => self.fetch_us(&pick.stock_code).await,
                    Market::Hk | Market::Cn => self.fetch_daily(&pick.stock_code).await,
                };
                match fetched {
                    Ok(data) => {
                        info!("{}: price={} change={}%", pick.stock_code, data.price, data.weekly_change);
                        pick.market = data;
                        stats.enriched += 1;
                    }
                    Err(MarketDataError::InsufficientPrivilege(msg)) => {
                        warn!("{}: account lacks privilege for daily_basic ({msg})", pick.stock_code);
                        degrade(pick);
                        stats.degraded += 1;
                    }
                    Err(e) => {
                        warn!("{}: market data unavailable: {e}", pick.stock_code);
                        degrade(pick);
                        stats.degraded += 1;
                    }
                }
            }
        }

        info!(
            "Enrichment: {} enriched, {} degraded, {} skipped",
            stats.enriched, stats.degraded, stats.skipped
        );
        stats
    }

    async fn fetch_us(&self, code: &str) -> Result<MarketData, MarketDataError> {
        let Some(source) = self.us.as_deref() else {
            return Err(MarketDataError::BadResponse("US source not configured".into()));
        };

        self.us_throttle.ready().await;
        let quote = source.global_quote(code).await?;
        self.us_throttle.ready().await;
        let overview = source.overview(code).await?;

        let text = |field: &Option<String>| Metric::from_text(field.as_deref().unwrap_or_default());
        Ok(MarketData {
            price: Metric::Value(format!("{} USD", quote.price)),
            market_cap: overview
                .market_capitalization
                .as_deref()
                .map(scale_market_cap)
                .unwrap_or_default(),
            pe_ratio: text(&overview.pe_ratio),
            ps_ratio: text(&overview.price_to_sales_ttm),
            pb_ratio: text(&overview.price_to_book),
            roe_ratio: text(&overview.return_on_equity_ttm),
            weekly_change: parse_percent(&quote.change_percent),
            monthly_change: Metric::Unavailable,
            source_link: overview_link(code),
        })
    }

    async fn fetch_daily(&self, code: &str) -> Result<MarketData, MarketDataError> {
        let Some(source) = self.daily.as_deref() else {
            return Err(MarketDataError::BadResponse("daily-basis source not configured".into()));
        };

        let ts_code = code.trim().to_ascii_uppercase();
        let row = source.daily_basic(&ts_code).await?;
        let currency = listing_currency(&ts_code);

        Ok(MarketData {
            price: row
                .close
                .map(|close| Metric::Value(format!("{close} {currency}")))
                .unwrap_or_default(),
            market_cap: row.total_mv.map(scale_market_value).unwrap_or_default(),
            pe_ratio: Metric::from(row.pe_ttm),
            ps_ratio: Metric::Unavailable,
            pb_ratio: Metric::from(row.pb),
            roe_ratio: Metric::Unavailable,
            weekly_change: Metric::from(row.change_pct),
            monthly_change: Metric::Unavailable,
            source_link: quote_page_link(code),
        })
    }
}

fn degrade(pick: &mut StockPick) {
    pick.market = MarketData::unavailable(quote_page_link(&pick.stock_code));
}

/// US market capitalization in dollars, shown in T/B units past 10^12 / 10^9.
pub fn scale_market_cap(raw: &str) -> Metric {
    let Ok(value) = raw.trim().parse::<u64>() else {
        return Metric::from_text(raw);
    };
    let value = Decimal::from(value);
    let trillion = dec!(1_000_000_000_000);
    let billion = dec!(1_000_000_000);
    if value >= trillion {
        Metric::Value(format!("{:.2} T", round2(value / trillion)))
    } else if value >= billion {
        Metric::Value(format!("{:.2} B", round2(value / billion)))
    } else {
        Metric::Value(value.to_string())
    }
}

/// Daily-basis market value (10^4 CNY units) in billions.
pub fn scale_market_value(total_mv: f64) -> Metric {
    match Decimal::from_f64(total_mv) {
        Some(value) => Metric::Value(format!("{:.2} B", round2(value / dec!(100_000)))),
        None => Metric::Unavailable,
    }
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `"-1.2093%"` -> `-1.21`.
fn parse_percent(raw: &str) -> Metric {
    let value = raw.trim().trim_end_matches('%').trim().parse::<f64>().ok();
    Metric::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::throttle::tests::FakeClock;
    use crate::market::{CompanyOverview, DailyBasic, GlobalQuote};
    use crate::types::{Sentiment, UNAVAILABLE};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct FakeUs {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl UsMarketSource for FakeUs {
        async fn global_quote(&self, symbol: &str) -> Result<GlobalQuote, MarketDataError> {
            self.calls.lock().unwrap().push(format!("quote:{symbol}"));
            match symbol {
                "FAIL" => Err(MarketDataError::Network("connection reset".into())),
                _ => Ok(GlobalQuote {
                    price: "189.84".into(),
                    change_percent: "2.5%".into(),
                }),
            }
        }

        async fn overview(&self, symbol: &str) -> Result<CompanyOverview, MarketDataError> {
            self.calls.lock().unwrap().push(format!("overview:{symbol}"));
            Ok(CompanyOverview {
                market_capitalization: Some("2950000000000".into()),
                pe_ratio: Some("29.4".into()),
                price_to_sales_ttm: Some("7.6".into()),
                return_on_equity_ttm: Some("1.47".into()),
                price_to_book: Some("None".into()),
            })
        }
    }

    struct FakeDaily;

    #[async_trait]
    impl DailyBasicSource for FakeDaily {
        async fn daily_basic(&self, ts_code: &str) -> Result<DailyBasic, MarketDataError> {
            match ts_code {
                "600519.SH" => Ok(DailyBasic {
                    trade_date: Some("20240520".into()),
                    close: Some(1725.5),
                    pe_ttm: Some(25.31),
                    pb: Some(9.0),
                    total_mv: Some(216_760_000.0),
                    change_pct: None,
                }),
                "700.HK" => Err(MarketDataError::InsufficientPrivilege("没有访问该接口的权限".into())),
                _ => Err(MarketDataError::Empty(ts_code.into())),
            }
        }
    }

    fn pick(code: &str) -> StockPick {
        StockPick {
            stock_code: code.into(),
            company_name: "公司".into(),
            reason: "理由".into(),
            market: MarketData::unavailable(String::new()),
        }
    }

    fn report(us: &[&str], hk: &[&str], cn: &[&str]) -> Report {
        Report {
            overall_sentiment: Sentiment::Neutral,
            overall_summary: "S".into(),
            daily_commentary: "C".into(),
            related_news_links: vec![],
            us_picks: us.iter().map(|c| pick(c)).collect(),
            hk_picks: hk.iter().map(|c| pick(c)).collect(),
            cn_picks: cn.iter().map(|c| pick(c)).collect(),
            investment_plan: vec![],
            generated_at: chrono::Local::now(),
        }
    }

    #[test]
    fn test_scale_market_cap() {
        assert_eq!(scale_market_cap("2950000000000").as_str(), "2.95 T");
        assert_eq!(scale_market_cap("87654321000").as_str(), "87.65 B");
        assert_eq!(scale_market_cap("999999999").as_str(), "999999999");
        assert_eq!(scale_market_cap("None"), Metric::Unavailable);
    }

    #[test]
    fn test_scale_market_value_to_billions() {
        assert_eq!(scale_market_value(216_760_000.0).as_str(), "2167.60 B");
        assert_eq!(scale_market_value(f64::NAN), Metric::Unavailable);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("-1.2093%").as_str(), "-1.21");
        assert_eq!(parse_percent("garbage"), Metric::Unavailable);
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_with_fallback_links() {
        let enricher = Enricher::new(None, None, Throttle::new(Duration::ZERO));
        let mut report = report(&["AAPL"], &["700.HK", "1810.HK"], &["600519.SH"]);
        let stats = enricher.enrich(&mut report).await;

        assert_eq!(stats, EnrichStats { enriched: 0, degraded: 0, skipped: 4 });
        let aapl = &report.us_picks[0].market;
        assert_eq!(aapl, &MarketData::unavailable("https://finance.yahoo.com/quote/AAPL".into()));
        assert_eq!(report.hk_picks[0].market.source_link, "https://finance.yahoo.com/quote/0700.HK");
        assert_eq!(report.hk_picks[1].market.source_link, "https://finance.yahoo.com/quote/1810.HK");
        assert_eq!(report.cn_picks[0].market.price.as_str(), UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_us_picks_enriched_and_throttled() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let clock = Arc::new(FakeClock::new());
        let enricher = Enricher::new(
            Some(Box::new(FakeUs { calls: calls.clone() })),
            None,
            Throttle::with_clock(Duration::from_secs(15), clock.clone()),
        );
        let mut report = report(&["AAPL", "FAIL", "MSFT"], &[], &[]);
        let stats = enricher.enrich(&mut report).await;

        assert_eq!(stats, EnrichStats { enriched: 2, degraded: 1, skipped: 0 });
        let aapl = &report.us_picks[0].market;
        assert_eq!(aapl.price.as_str(), "189.84 USD");
        assert_eq!(aapl.market_cap.as_str(), "2.95 T");
        assert_eq!(aapl.weekly_change.as_str(), "2.50");
        assert_eq!(aapl.pb_ratio, Metric::Unavailable);
        assert_eq!(aapl.monthly_change, Metric::Unavailable);
        assert_eq!(aapl.source_link, overview_link("AAPL"));

        let failed = &report.us_picks[1].market;
        assert_eq!(failed, &MarketData::unavailable(quote_page_link("FAIL")));

        // quote+overview, quote (fails), quote+overview
        assert_eq!(calls.lock().unwrap().len(), 5);
        assert_eq!(clock.total_slept(), Duration::from_secs(15 * 4));
    }

    #[tokio::test]
    async fn test_daily_basis_paths_never_raise() {
        let enricher = Enricher::new(None, Some(Box::new(FakeDaily)), Throttle::new(Duration::ZERO));
        let mut report = report(&[], &["700.HK", "9999.HK"], &["600519.sh"]);
        let stats = enricher.enrich(&mut report).await;

        assert_eq!(stats, EnrichStats { enriched: 1, degraded: 2, skipped: 0 });
        let moutai = &report.cn_picks[0].market;
        assert_eq!(moutai.price.as_str(), "1725.5 CNY");
        assert_eq!(moutai.market_cap.as_str(), "2167.60 B");
        assert_eq!(moutai.pe_ratio.as_str(), "25.31");
        assert_eq!(moutai.pb_ratio.as_str(), "9.00");
        assert_eq!(moutai.weekly_change, Metric::Unavailable);
        assert_eq!(moutai.source_link, "https://finance.yahoo.com/quote/600519.sh");

        let tencent = &report.hk_picks[0].market;
        assert_eq!(tencent, &MarketData::unavailable("https://finance.yahoo.com/quote/0700.HK".into()));
    }
}
