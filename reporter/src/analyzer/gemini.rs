use crate::analyzer::ReportModel;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client, optionally grounded with Google Search.
pub struct GeminiClient {
    api_key: String,
    model: String,
    search: bool,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, search: bool) -> Self {
        Self::with_base_url(api_key, model, search, API_BASE)
    }

    pub fn with_base_url(api_key: &str, model: &str, search: bool, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            search,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Returns (response_text, cost). Cost uses Flash list pricing and is only logged.
    pub async fn call(&self, system: &str, user_msg: &str) -> Result<(String, Decimal)> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        let req = GeminiRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart { text: system.to_string() }],
            },
            contents: vec![GeminiMessage {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: user_msg.to_string() }],
            }],
            tools: if self.search {
                vec![GeminiTool { google_search: serde_json::json!({}) }]
            } else {
                Vec::new()
            },
            generation_config: GenerationConfig { temperature: 0.4 },
        };

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Gemini API request: {}", e.without_url()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            anyhow::bail!("Gemini API {status}: {snippet}");
        }

        let data: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Parse Gemini response: {}", e.without_url()))?;

        let text = data
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        if text.trim().is_empty() {
            anyhow::bail!("Gemini returned empty response");
        }

        let usage = data.usage_metadata.unwrap_or(UsageMetadata {
            prompt_token_count: 0,
            candidates_token_count: 0,
        });

        // $0.30/1M input, $2.50/1M output
        let input_cost = Decimal::from(usage.prompt_token_count) * dec!(0.0000003);
        let output_cost = Decimal::from(usage.candidates_token_count) * dec!(0.0000025);
        let cost = input_cost + output_cost;

        debug!(
            "Gemini: {} tokens in, {} tokens out, ${cost}",
            usage.prompt_token_count, usage.candidates_token_count
        );

        Ok((text, cost))
    }
}

#[async_trait]
impl ReportModel for GeminiClient {
    async fn complete(&self, system: &str, user_msg: &str) -> Result<String> {
        info!("Calling Gemini ({})...", self.model);
        let (text, cost) = self.call(system, user_msg).await?;
        info!("Gemini replied with {} chars (${cost})", text.chars().count());
        debug!("Raw Gemini reply: {text}");
        Ok(text)
    }
}
