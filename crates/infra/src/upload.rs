//! Upload adapters: a local published folder, or an HTTP object store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use blueprint_pipeline::{RenderedArtifact, UploadError, UploadedFile, Uploader};

use crate::config::UploadConfig;

/// Copies artifacts under `root`; the copy is what gets published.
#[derive(Debug, Clone)]
pub struct FolderUploader {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FolderUploader {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Uploader for FolderUploader {
    fn upload(&self, artifact: &RenderedArtifact, destination: &str) -> Result<UploadedFile, UploadError> {
        let target = self.root.join(destination);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| UploadError::Remote(format!("{}: {e}", parent.display())))?;
        }
        let bytes = artifact.bytes().map_err(|e| UploadError::Artifact(e.to_string()))?;
        std::fs::write(&target, bytes.as_ref()).map_err(|e| UploadError::Remote(format!("{}: {e}", target.display())))?;

        debug!(target = %target.display(), "copied artifact");
        Ok(UploadedFile {
            id: destination.to_string(),
            link: self
                .public_base_url
                .as_ref()
                .map(|base| format!("{}/{destination}", base.trim_end_matches('/'))),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredObject {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// `PUT`s artifacts to `<endpoint>/<destination>`.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            timeout,
        }
    }

    fn url(&self, destination: &str) -> String {
        format!("{}/{destination}", self.endpoint.trim_end_matches('/'))
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, artifact: &RenderedArtifact, destination: &str) -> Result<UploadedFile, UploadError> {
        let bytes = artifact.bytes().map_err(|e| UploadError::Artifact(e.to_string()))?;
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| UploadError::Remote(e.to_string()))?;

        let mut req = client
            .put(self.url(destination))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(bytes.into_owned());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(|e| UploadError::Remote(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(UploadError::Remote(format!("{status}: {}", body.trim())));
        }
        let stored: StoredObject = resp.json().map_err(|e| UploadError::Remote(e.to_string()))?;

        debug!(id = %stored.id, "uploaded artifact");
        Ok(UploadedFile {
            id: stored.id,
            link: stored.web_view_link,
        })
    }
}

/// Build the uploader selected by the config.
pub fn uploader_from_config(config: &UploadConfig) -> Arc<dyn Uploader> {
    match config {
        UploadConfig::Folder { root, public_base_url } => {
            Arc::new(FolderUploader::new(root.clone(), public_base_url.clone()))
        }
        UploadConfig::Http {
            endpoint,
            token,
            timeout_secs,
        } => Arc::new(HttpUploader::new(
            endpoint.clone(),
            token.clone(),
            Duration::from_secs(*timeout_secs),
        )),
    }
}
