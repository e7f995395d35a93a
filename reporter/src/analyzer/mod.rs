pub mod gemini;
pub mod prompt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

pub use gemini::GeminiClient;

/// Anything that can answer the report prompt with free text.
#[async_trait]
pub trait ReportModel: Send + Sync {
    async fn complete(&self, system: &str, user_msg: &str) -> Result<String>;
}

/// Serves a previously captured reply from disk instead of calling the model.
pub struct ReplayModel {
    path: String,
}

impl ReplayModel {
    pub fn new(path: &str) -> Self {
        Self { path: path.to_string() }
    }
}

#[async_trait]
impl ReportModel for ReplayModel {
    async fn complete(&self, _system: &str, _user_msg: &str) -> Result<String> {
        info!("Replaying AI reply from {}", self.path);
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Read replay file {}", self.path))
    }
}
