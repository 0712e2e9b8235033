//! HTTP render adapter.
//!
//! The render page is fetched with the item's parameters as a query string.
//! It answers with the PNG body and the scraped buy ids in `x-buy-ids`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::debug;

use blueprint_pipeline::{RenderError, RenderRequest, RenderedArtifact, Renderer};

use crate::config::RenderConfig;

pub const BUY_IDS_HEADER: &str = "x-buy-ids";

#[derive(Debug, Clone)]
pub struct HttpRenderer {
    endpoint: String,
    timeout: Duration,
    download_dir: PathBuf,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            download_dir: download_dir.into(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.endpoint.clone(), config.timeout(), config.download_dir.clone())
    }

    fn map_transport(&self, e: reqwest::Error) -> RenderError {
        if e.is_timeout() {
            RenderError::Timeout(self.timeout)
        } else {
            RenderError::Failed(e.to_string())
        }
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` so ids cannot form path
/// separators or `..`.
fn file_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "unknown".to_string() } else { cleaned }
}

/// `infinite-<league>-<team or user>.png`
pub fn artifact_name(params: &BTreeMap<String, String>) -> String {
    let league = params.get("leagueId").map(String::as_str).unwrap_or("unknown");
    let roster = params
        .get("teamId")
        .or_else(|| params.get("userId"))
        .map(String::as_str)
        .unwrap_or("unknown");
    format!("infinite-{}-{}.png", file_component(league), file_component(roster))
}

/// Map a non-success render status to an error.
pub fn status_error(status: StatusCode, body: &str) -> RenderError {
    if status == StatusCode::NOT_FOUND {
        RenderError::NotFound(if body.is_empty() { status.to_string() } else { body.to_string() })
    } else {
        RenderError::Failed(format!("{status}: {body}"))
    }
}

impl Renderer for HttpRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedArtifact, RenderError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RenderError::Failed(e.to_string()))?;

        let resp = client
            .get(&self.endpoint)
            .query(&request.params)
            .send()
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(status_error(status, body.trim()));
        }

        let buys = resp
            .headers()
            .get(BUY_IDS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RenderError::Failed(format!("response is missing {BUY_IDS_HEADER}")))?;
        let bytes = resp.bytes().map_err(|e| self.map_transport(e))?;

        std::fs::create_dir_all(&self.download_dir)
            .map_err(|e| RenderError::Failed(format!("{}: {e}", self.download_dir.display())))?;
        let path = self.download_dir.join(artifact_name(&request.params));
        // Own the path before writing so a partial file is still removed.
        let artifact = RenderedArtifact::from_file(&path, buys);
        std::fs::write(&path, &bytes).map_err(|e| RenderError::Failed(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), size = bytes.len(), buys = artifact.buys(), "downloaded render");
        Ok(artifact)
    }
}
