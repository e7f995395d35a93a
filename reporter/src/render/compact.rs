use crate::render::{percent, report_title};
use crate::types::{truncate_chars, Market, Report, StockPick};
use chrono::{DateTime, Local};

/// Notion's hard ceiling for one rich-text value, in characters.
pub const RICH_TEXT_LIMIT: usize = 2000;
const TRUNCATED_CHARS: usize = 1995;

/// Cut text over the ceiling to its first 1995 characters plus `...`.
pub fn bound_rich_text(text: &str) -> String {
    truncate_chars(text, RICH_TEXT_LIMIT, TRUNCATED_CHARS)
}

fn compact_pick(index: usize, pick: &StockPick) -> String {
    let mut line = format!(
        "[{}. {} ({}): {}]",
        index + 1,
        pick.company_name,
        pick.stock_code,
        pick.reason
    );
    if pick.market.price.is_available() {
        line.push_str(&format!(" | 价格: {}", pick.market.price));
    }
    if pick.market.weekly_change.is_available() {
        line.push_str(&format!(" | 周涨幅: {}", percent(&pick.market.weekly_change)));
    }
    line
}

/// One market's picks as a single bounded rich-text string.
pub fn compact_picks(picks: &[StockPick], market: Market) -> String {
    if picks.is_empty() {
        return format!("暂无{}推荐。", market.label());
    }
    let joined = picks
        .iter()
        .enumerate()
        .map(|(i, pick)| compact_pick(i, pick))
        .collect::<Vec<_>>()
        .join("\n\n");
    bound_rich_text(&joined)
}

/// Everything the wiki page needs, already bounded.
#[derive(Debug, Clone)]
pub struct PageDraft {
    pub title: String,
    pub sentiment: String,
    pub summary: String,
    pub commentary: String,
    pub picks: Vec<(Market, String)>,
    pub crawled_at: DateTime<Local>,
}

pub fn page_draft(report: &Report) -> PageDraft {
    PageDraft {
        title: report_title(report.generated_at),
        sentiment: report.overall_sentiment.label().to_string(),
        summary: bound_rich_text(&report.overall_summary),
        commentary: bound_rich_text(&report.daily_commentary),
        picks: Market::ALL
            .iter()
            .map(|&market| (market, compact_picks(report.picks(market), market)))
            .collect(),
        crawled_at: report.generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketData, Metric, Sentiment, ELLIPSIS};

    fn pick(code: &str, reason: &str) -> StockPick {
        StockPick {
            stock_code: code.into(),
            company_name: "腾讯控股".into(),
            reason: reason.into(),
            market: MarketData::unavailable(String::new()),
        }
    }

    #[test]
    fn test_compact_line_format() {
        let mut enriched = pick("700.HK", "社交龙头");
        enriched.market.price = Metric::Value("380.2 HKD".into());
        enriched.market.weekly_change = Metric::Value("1.25".into());
        let plain = pick("9988.HK", "电商");

        let text = compact_picks(&[enriched, plain], Market::Hk);
        assert_eq!(
            text,
            "[1. 腾讯控股 (700.HK): 社交龙头] | 价格: 380.2 HKD | 周涨幅: 1.25%\n\n[2. 腾讯控股 (9988.HK): 电商]"
        );
    }

    #[test]
    fn test_long_sequence_truncated_at_tail() {
        let picks: Vec<_> = (0..10).map(|i| pick(&format!("{i}.HK"), &"长".repeat(300))).collect();
        let text = compact_picks(&picks, Market::Hk);
        assert_eq!(text.chars().count(), 1998);
        assert!(text.ends_with("..."));
        assert!(text.starts_with("[1. 腾讯控股 (0.HK): "));
    }

    #[test]
    fn test_exact_limit_not_truncated() {
        let text = "a".repeat(RICH_TEXT_LIMIT);
        assert_eq!(bound_rich_text(&text), text);
        let over = "a".repeat(RICH_TEXT_LIMIT + 1);
        assert_eq!(bound_rich_text(&over).chars().count(), TRUNCATED_CHARS + ELLIPSIS.len());
    }

    #[test]
    fn test_empty_market_has_placeholder() {
        assert_eq!(compact_picks(&[], Market::Us), "暂无美股推荐。");
    }

    #[test]
    fn test_page_draft_bounds_every_field() {
        let report = Report {
            overall_sentiment: Sentiment::Negative,
            overall_summary: "S".repeat(2500),
            daily_commentary: "C".into(),
            related_news_links: vec![],
            us_picks: vec![],
            hk_picks: vec![pick("700.HK", "r")],
            cn_picks: vec![],
            investment_plan: vec![],
            generated_at: Local::now(),
        };
        let draft = page_draft(&report);
        assert_eq!(draft.sentiment, "利空");
        assert_eq!(draft.summary.chars().count(), 1998);
        assert_eq!(draft.picks.len(), 3);
        assert_eq!(draft.picks[0], (Market::Us, "暂无美股推荐。".to_string()));
        assert!(draft.title.starts_with("【理财分析】每周理财分析报告 - "));
    }
}
