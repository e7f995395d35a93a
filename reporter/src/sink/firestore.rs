use crate::error::ReportError;
use crate::sink::DocumentSink;
use crate::types::Report;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

const SINK: &str = "Firestore";

/// Firestore REST client writing `artifacts/{app_id}/public/data/finance_reports/latest`.
pub struct FirestoreClient {
    project_id: String,
    app_id: String,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: String,
}

impl FirestoreClient {
    pub fn new(project_id: &str, app_id: &str, access_token: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            app_id: app_id.to_string(),
            access_token: access_token.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("HTTP client"),
        }
    }

    /// Build from the service-account JSON; only `project_id` is read.
    pub fn from_service_account(
        config_json: &str,
        app_id: &str,
        access_token: &str,
    ) -> Result<Self, ReportError> {
        let account: ServiceAccount = serde_json::from_str(config_json)
            .map_err(|e| ReportError::sink_write(SINK, format!("invalid service-account JSON: {e}")))?;
        Ok(Self::new(&account.project_id, app_id, access_token))
    }

    pub fn document_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/artifacts/{}/public/data/finance_reports/latest",
            self.project_id, self.app_id
        )
    }
}

/// Typed Firestore value for a plain JSON value.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

fn to_firestore_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), to_firestore_value(v)))
            .collect(),
    )
}

pub fn document_body(report: &Report) -> Result<Value, ReportError> {
    let value = serde_json::to_value(report).map_err(|e| ReportError::sink_write(SINK, e))?;
    match value {
        Value::Object(map) => Ok(json!({ "fields": to_firestore_fields(&map) })),
        _ => Err(ReportError::sink_write(SINK, "report did not serialize to an object")),
    }
}

#[async_trait]
impl DocumentSink for FirestoreClient {
    async fn write_latest(&self, report: &Report) -> Result<(), ReportError> {
        let body = document_body(report)?;
        let url = self.document_url();
        debug!("Firestore PATCH {url}");

        // PATCH without an update mask replaces the whole document.
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::sink_write(SINK, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            return Err(ReportError::sink_write(SINK, format!("{status}: {snippet}")));
        }

        info!("Report written to Firestore ({})", self.app_id);
        Ok(())
    }
}
