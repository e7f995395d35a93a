use crate::render::{percent, REPORT_NAME};
use crate::types::{InvestmentPlanItem, Market, NewsLink, Report, Sentiment, StockPick};

const TH_STYLE: &str = "padding:8px;border:1px solid #dee2e6;background:#f1f3f5;color:#333;font-size:13px;text-align:left";
const TD_STYLE: &str = "padding:8px;border:1px solid #dee2e6;color:#333;font-size:13px;vertical-align:top";
const H2_STYLE: &str = "margin:28px 0 12px;color:#1a3c6e;font-size:18px;border-bottom:2px solid #1a3c6e;padding-bottom:6px";
const H3_STYLE: &str = "margin:20px 0 8px;color:#333;font-size:15px";

/// Badge colors for the overall sentiment: (background, foreground).
pub fn sentiment_palette(sentiment: &Sentiment) -> (&'static str, &'static str) {
    match sentiment {
        Sentiment::Positive => ("#d4edda", "#155724"),
        Sentiment::Negative => ("#f8d7da", "#721c24"),
        Sentiment::Neutral => ("#fff3cd", "#856404"),
        Sentiment::Other(_) => ("#e2e3e5", "#383d41"),
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped text with line breaks kept as `<br>`.
fn multiline(text: &str) -> String {
    escape(text).replace("\r\n", "\n").replace('\n', "<br>")
}

fn is_web_link(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

enum Cell {
    Text(String),
    Link { href: String, label: String },
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(value) => multiline(value),
            Cell::Link { href, label } if is_web_link(href) => format!(
                r#"<a href="{}" style="color:#1a73e8;text-decoration:none">{}</a>"#,
                escape(href.trim()),
                escape(label)
            ),
            Cell::Link { label, .. } => escape(label),
        }
    }
}

struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
    placeholder: String,
}

impl Table {
    fn new(headers: Vec<&'static str>, placeholder: impl Into<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            placeholder: placeholder.into(),
        }
    }

    fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    fn render(&self) -> String {
        let head: String = self
            .headers
            .iter()
            .map(|h| format!(r#"<th style="{TH_STYLE}">{}</th>"#, escape(h)))
            .collect();

        let body: String = if self.rows.is_empty() {
            format!(
                r#"<tr><td colspan="{}" style="{TD_STYLE};text-align:center;color:#888">{}</td></tr>"#,
                self.headers.len(),
                escape(&self.placeholder)
            )
        } else {
            self.rows
                .iter()
                .map(|row| {
                    let cells: String = row
                        .iter()
                        .map(|c| format!(r#"<td style="{TD_STYLE}">{}</td>"#, c.render()))
                        .collect();
                    format!("<tr>{cells}</tr>")
                })
                .collect()
        };

        format!(
            r#"<table width="100%" cellpadding="0" cellspacing="0" style="border-collapse:collapse;margin-bottom:12px"><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>"#
        )
    }
}

fn picks_table(market: Market, picks: &[StockPick]) -> Table {
    let headers = match market {
        Market::Us => vec!["公司", "价格", "市值", "周涨幅", "月涨幅", "市盈率", "市销率", "ROE", "入选理由", "数据来源"],
        Market::Hk | Market::Cn => vec!["公司", "价格", "市值", "周涨幅", "月涨幅", "市盈率", "市净率", "入选理由", "数据来源"],
    };
    let mut table = Table::new(headers, format!("暂无{}推荐。", market.label()));

    for pick in picks {
        let data = &pick.market;
        let mut cells = vec![
            Cell::text(format!("{} ({})", pick.company_name, pick.stock_code)),
            Cell::text(data.price.as_str()),
            Cell::text(data.market_cap.as_str()),
            Cell::text(percent(&data.weekly_change)),
            Cell::text(percent(&data.monthly_change)),
            Cell::text(data.pe_ratio.as_str()),
        ];
        match market {
            Market::Us => {
                cells.push(Cell::text(data.ps_ratio.as_str()));
                cells.push(Cell::text(data.roe_ratio.as_str()));
            }
            Market::Hk | Market::Cn => cells.push(Cell::text(data.pb_ratio.as_str())),
        }
        cells.push(Cell::text(pick.reason.as_str()));
        cells.push(Cell::Link {
            href: data.source_link.clone(),
            label: "查看".to_string(),
        });
        table.row(cells);
    }
    table
}

fn plan_table(plan: &[InvestmentPlanItem]) -> Table {
    let mut table = Table::new(
        vec!["资产名称", "类型", "配置比例", "预期收益", "买卖时机", "持有策略"],
        "暂无投资组合建议。",
    );
    for item in plan {
        table.row(vec![
            Cell::text(item.asset_name.as_str()),
            Cell::text(item.asset_type.as_str()),
            Cell::text(item.allocation_ratio.as_str()),
            Cell::text(item.expected_gain.as_str()),
            Cell::text(item.buy_sell_timing.as_str()),
            Cell::text(item.holding_strategy.as_str()),
        ]);
    }
    table
}

fn news_list(links: &[NewsLink]) -> String {
    if links.is_empty() {
        return r#"<p style="color:#888;font-size:13px">暂无相关资讯。</p>"#.to_string();
    }
    let items: String = links
        .iter()
        .map(|link| {
            let title = if link.title.trim().is_empty() { &link.url } else { &link.title };
            let cell = Cell::Link {
                href: link.url.clone(),
                label: title.clone(),
            };
            format!(r#"<li style="margin:4px 0;font-size:13px">{}</li>"#, cell.render())
        })
        .collect();
    format!(r#"<ul style="padding-left:20px;margin:0">{items}</ul>"#)
}

fn section(heading: &str, body: &str) -> String {
    format!(r#"<h2 style="{H2_STYLE}">{}</h2>{body}"#, escape(heading))
}

/// Full HTML document for the report email.
pub fn render_html(report: &Report) -> String {
    let (badge_bg, badge_fg) = sentiment_palette(&report.overall_sentiment);
    let date = report.generated_at.format("%Y年%m月%d日");

    let mut sections = Vec::new();

    sections.push(section(
        "核心分析",
        &format!(
            r#"<p style="margin:0 0 10px"><span style="background:{badge_bg};color:{badge_fg};padding:4px 12px;border-radius:12px;font-size:13px;font-weight:bold">整体情绪: {}</span></p>
<p style="font-size:14px;line-height:1.6;color:#333">{}</p>"#,
            escape(report.overall_sentiment.label()),
            multiline(&report.overall_summary)
        ),
    ));

    sections.push(section(
        "每周点评与预判",
        &format!(
            r#"<p style="font-size:14px;line-height:1.6;color:#333">{}</p>"#,
            multiline(&report.daily_commentary)
        ),
    ));

    if !report.investment_plan.is_empty() {
        sections.push(section("投资组合建议", &plan_table(&report.investment_plan).render()));
    }

    let picks: String = Market::ALL
        .iter()
        .map(|&market| {
            format!(
                r#"<h3 style="{H3_STYLE}">{}推荐</h3>{}"#,
                market.label(),
                picks_table(market, report.picks(market)).render()
            )
        })
        .collect();
    sections.push(section("中长线投资推荐", &picks));

    sections.push(section("相关资讯", &news_list(&report.related_news_links)));

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>{name}</title></head>
<body style="margin:0;padding:0;background:#f5f6f8;font-family:'Segoe UI',Arial,'Microsoft YaHei',sans-serif">
<div style="max-width:960px;margin:20px auto;background:#fff;border-radius:10px;border:1px solid #e1e4e8;padding:24px 28px">
<h1 style="margin:0;color:#1a3c6e;font-size:22px">{name}</h1>
<p style="margin:6px 0 0;color:#888;font-size:13px">生成日期: {date} &mdash; 由 Gemini AI 分析，行情数据来自 Alpha Vantage 与 Tushare</p>
{body}
<hr style="border:none;border-top:1px solid #e1e4e8;margin:24px 0 12px">
<p style="color:#999;font-size:12px">本报告仅供参考，不构成投资建议。</p>
</div>
</body></html>"#,
        name = REPORT_NAME,
        body = sections.join("\n"),
    )
}

/// Short notice used for failure mails.
pub fn render_notice(title: &str, detail: &str) -> String {
    format!(
        r#"<div style="font-family:Arial,sans-serif;max-width:720px;margin:0 auto;padding:20px;background:#fff;color:#333;border:1px solid #f5c6cb;border-radius:10px">
<h2 style="color:#721c24;margin:0 0 12px">{}</h2>
<pre style="font-size:13px;line-height:1.5;white-space:pre-wrap;background:#f8f9fa;padding:12px;border-radius:6px">{}</pre>
<hr style="border:none;border-top:1px solid #eee;margin:16px 0">
<p style="color:#999;font-size:12px">{REPORT_NAME}</p>
</div>"#,
        escape(title),
        escape(detail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketData, Metric};
    use chrono::{Local, TimeZone};

    fn report() -> Report {
        Report {
            overall_sentiment: Sentiment::Positive,
            overall_summary: "市场<稳健>".into(),
            daily_commentary: "美股市场点评：上涨\n港股市场点评：震荡".into(),
            related_news_links: vec![],
            us_picks: vec![],
            hk_picks: vec![],
            cn_picks: vec![],
            investment_plan: vec![],
            generated_at: Local.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_report_has_placeholders() {
        let html = render_html(&report());
        assert!(html.contains("#d4edda"));
        assert!(html.contains("暂无美股推荐。"));
        assert!(html.contains("暂无港股推荐。"));
        assert!(html.contains("暂无A股推荐。"));
        assert!(html.contains("暂无相关资讯。"));
        assert!(!html.contains("投资组合建议"));
        assert!(html.contains("2024年05月20日"));
    }

    #[test]
    fn test_text_is_escaped_and_lines_kept() {
        let html = render_html(&report());
        assert!(html.contains("市场&lt;稳健&gt;"));
        assert!(html.contains("上涨<br>港股市场点评"));
    }

    #[test]
    fn test_palette_fallback() {
        assert_eq!(sentiment_palette(&Sentiment::Negative).0, "#f8d7da");
        assert_eq!(sentiment_palette(&Sentiment::Other("N/A".into())), ("#e2e3e5", "#383d41"));
    }

    #[test]
    fn test_us_table_has_extra_ratios() {
        let mut pick = StockPick {
            stock_code: "AAPL".into(),
            company_name: "苹果公司".into(),
            reason: "生态".into(),
            market: MarketData::unavailable("https://finance.yahoo.com/quote/AAPL".into()),
        };
        pick.market.weekly_change = Metric::Value("2.50".into());
        let us = picks_table(Market::Us, &[pick.clone()]).render();
        assert!(us.contains("市销率") && us.contains("ROE"));
        assert!(us.contains("2.50%"));
        assert!(us.contains(r#"href="https://finance.yahoo.com/quote/AAPL""#));

        let hk = picks_table(Market::Hk, &[pick]).render();
        assert!(hk.contains("市净率") && !hk.contains("ROE"));
    }

    #[test]
    fn test_non_web_links_render_as_text() {
        let html = news_list(&[
            NewsLink { title: "正常".into(), url: "https://example.com/a".into() },
            NewsLink { title: "脚本".into(), url: "javascript:alert(1)".into() },
        ]);
        assert!(html.contains(r#"href="https://example.com/a""#));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("脚本"));
    }

    #[test]
    fn test_plan_section_when_present() {
        let mut r = report();
        r.investment_plan.push(InvestmentPlanItem {
            asset_name: "沪深300ETF".into(),
            asset_type: "ETF".into(),
            allocation_ratio: "30%".into(),
            expected_gain: "8%".into(),
            buy_sell_timing: "分批".into(),
            holding_strategy: "长期".into(),
        });
        let html = render_html(&r);
        assert!(html.contains("投资组合建议"));
        assert!(html.contains("沪深300ETF"));
    }
}
