use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_search: bool,
    pub alpha_vantage_api_key: String,
    pub alpha_vantage_min_interval_secs: u64,
    pub tushare_api_key: String,
    pub tushare_api_url: String,
    pub notion_token: String,
    pub notion_database_id: String,
    pub notion_report_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub mail_from: String,
    pub recipients: Vec<String>,
    pub firebase_config_json: String,
    pub firestore_access_token: String,
    pub app_id: String,
    pub include_investment_plan: bool,
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).with_context(|| format!("Load config file {p}"))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build(|key| std::env::var(key).ok())
    }

    fn build(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let recipients = ["GMAIL_RECIPIENT_EMAILS", "GMAIL_RECIPIENT_EMAIL", "MAIL_RECIPIENTS"]
            .iter()
            .map(|key| parse_recipients(&env(key, "")))
            .find(|list| !list.is_empty())
            .unwrap_or_default();

        let interval = env("ALPHA_VANTAGE_MIN_INTERVAL_SECS", "15");
        let port = env("SMTP_PORT", "587");

        Ok(Self {
            gemini_api_key: env("GEMINI_API_KEY", ""),
            gemini_model: env("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_search: flag(&env("GEMINI_SEARCH", "true")),
            alpha_vantage_api_key: env("ALPHA_VANTAGE_API_KEY", ""),
            alpha_vantage_min_interval_secs: interval
                .trim()
                .parse()
                .with_context(|| format!("Invalid ALPHA_VANTAGE_MIN_INTERVAL_SECS: {interval}"))?,
            tushare_api_key: env("TUSHARE_API_KEY", ""),
            tushare_api_url: env("TUSHARE_API_URL", "https://api.tushare.pro"),
            notion_token: env("NOTION_TOKEN", ""),
            notion_database_id: env("NOTION_DATABASE_ID", ""),
            notion_report_url: env("NOTION_REPORT_URL", "https://example.com/finance-report"),
            smtp_host: env("SMTP_HOST", "smtp.gmail.com"),
            smtp_port: port
                .trim()
                .parse()
                .with_context(|| format!("Invalid SMTP_PORT: {port}"))?,
            smtp_user: env("SMTP_USER", ""),
            smtp_pass: env("SMTP_PASS", ""),
            mail_from: env("MAIL_FROM", ""),
            recipients,
            firebase_config_json: env("FIREBASE_CONFIG_JSON", ""),
            firestore_access_token: env("FIRESTORE_ACCESS_TOKEN", ""),
            app_id: env("__app_id", "default-app-id"),
            include_investment_plan: flag(&env("INCLUDE_INVESTMENT_PLAN", "true")),
        })
    }
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Comma-separated addresses, trimmed, blanks dropped.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::build(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = build(&[]).unwrap();
        assert_eq!(cfg.gemini_model, "gemini-2.5-flash");
        assert!(cfg.gemini_search);
        assert_eq!(cfg.alpha_vantage_min_interval_secs, 15);
        assert_eq!(cfg.tushare_api_url, "https://api.tushare.pro");
        assert_eq!(cfg.smtp_port, 587);
        assert_eq!(cfg.app_id, "default-app-id");
        assert!(cfg.include_investment_plan);
        assert!(cfg.recipients.is_empty());
    }

    #[test]
    fn test_recipients_split_and_fallback() {
        assert_eq!(parse_recipients(" a@x.com, ,b@x.com ,"), vec!["a@x.com", "b@x.com"]);

        let cfg = build(&[("GMAIL_RECIPIENT_EMAILS", " , "), ("GMAIL_RECIPIENT_EMAIL", "solo@x.com")]).unwrap();
        assert_eq!(cfg.recipients, vec!["solo@x.com"]);
    }

    #[test]
    fn test_flags_and_numbers() {
        let cfg = build(&[
            ("GEMINI_SEARCH", "false"),
            ("INCLUDE_INVESTMENT_PLAN", "0"),
            ("ALPHA_VANTAGE_MIN_INTERVAL_SECS", "12"),
        ])
        .unwrap();
        assert!(!cfg.gemini_search);
        assert!(!cfg.include_investment_plan);
        assert_eq!(cfg.alpha_vantage_min_interval_secs, 12);

        assert!(build(&[("SMTP_PORT", "smtp")]).is_err());
    }
}
