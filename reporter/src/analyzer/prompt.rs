use serde_json::{json, Value};

pub const SYSTEM: &str = "你是一名资深金融分析师。你必须严格根据可联网搜索到的过去一周（七天）的财经新闻和市场数据进行分析。";

const TASKS: &str = r#"请完成以下分析任务：
1. **整体市场情绪和摘要**：给出对整体市场情绪的判断（利好、利空或中性），并提供一份整体行情摘要。
2. **每周点评与预判**：给出对美股、港股和大陆股市的专业点评和对后续走势的预判。请将此部分内容格式化为一段清晰的文本（不要使用嵌套对象），用“美股市场点评：”等标题区分。
3. **中长线投资推荐**：
   - 选出美股、港股和中国沪深股市各10个值得中长线买入的股票。
   - **核心要求**：为每个推荐提供对应的公司中文名称、股票代码以及简短的入选理由（每个理由请控制在200字以内）。
   - **重要提示**：请不要在你的分析中提供任何股票价格、市值或涨跌幅数据。这些数据将由另一个独立的程序模块获取。
4. **相关资讯链接**：提供你所分析的市场的相关财经资讯链接，包括美股、港股和沪深股市。"#;

const PLAN_TASK: &str = "5. **投资组合建议**：给出一份中长线投资组合，每项包含资产名称、资产类型、配置比例、预期收益、买卖时机和持有策略。";

const FORMAT_RULES: &str = "你**不允许**在JSON结构的前后添加任何额外文本、解释或免责声明。请将所有分析结果以**严格的JSON格式**返回，确保可直接解析。JSON对象的结构如下：";

/// Example of the reply shape the model must follow.
pub fn example_shape(include_plan: bool) -> Value {
    let mut shape = json!({
        "overallSentiment": "利好",
        "overallSummary": "...",
        "dailyCommentary": "...",
        "relatedNewsLinks": [
            { "title": "...", "url": "..." }
        ],
        "usTop10Stocks": [
            { "stockCode": "AAPL", "companyName": "苹果公司", "reason": "..." }
        ],
        "hkTop10Stocks": [
            { "stockCode": "700.HK", "companyName": "腾讯控股", "reason": "..." }
        ],
        "cnTop10Stocks": [
            { "stockCode": "600519.SH", "companyName": "贵州茅台", "reason": "..." }
        ]
    });
    if include_plan {
        shape["investmentPortfolio"] = json!([{
            "assetName": "...",
            "assetType": "股票/ETF/债券",
            "allocationRatio": "20%",
            "expectedGain": "...",
            "buySellTiming": "...",
            "holdingStrategy": "..."
        }]);
    }
    shape
}

/// User message: the task list followed by the pretty-printed example shape.
pub fn user_message(include_plan: bool) -> String {
    let shape = serde_json::to_string_pretty(&example_shape(include_plan)).unwrap_or_default();
    let plan = if include_plan { format!("\n{PLAN_TASK}") } else { String::new() };
    format!("{TASKS}{plan}\n\n{FORMAT_RULES}\n{shape}")
}
