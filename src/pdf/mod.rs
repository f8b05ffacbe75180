use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::config::RendererConfig;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("pdf renderer unavailable")]
    Unavailable,
    #[error("pdf renderer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("pdf renderer returned status {status}")]
    Failed { status: u16 },
}

/// Client for the external HTML-to-PDF rendering service. No PDF logic
/// lives in this process; the service receives HTML and answers with the
/// finished byte stream.
pub struct PdfRenderer {
    client: Client,
    base_url: String,
}

impl PdfRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(&RendererConfig {
            base_url: base_url.to_string(),
            timeout_secs: 30,
        })
    }

    pub async fn health(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("PDF renderer health check failed: {}", e);
                false
            }
        }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>, RendererError> {
        let response = self
            .client
            .post(format!("{}/generate-pdf", self.base_url))
            .json(&serde_json::json!({ "html": html }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RendererError::Failed {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Health-gated render: the generation endpoint is never contacted when
    /// the service does not answer its health check. No retry on failure.
    pub async fn render_guarded(&self, html: &str) -> Result<Vec<u8>, RendererError> {
        if !self.health().await {
            return Err(RendererError::Unavailable);
        }
        self.render(html).await
    }
}
