//! Narrow interfaces to the external render, upload, and notify edges.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use blueprint_core::RecipientKey;

use crate::error::{NotifyError, RenderError, UploadError};

/// Parameters for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub key: RecipientKey,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug)]
enum Content {
    /// Downloaded file owned by the artifact; removed on drop.
    File(PathBuf),
    Memory(Vec<u8>),
}

/// A rendered image plus the metadata scraped alongside it.
///
/// The artifact owns its backing file: it is deleted when the artifact is
/// dropped, whichever way the item attempt ends.
#[derive(Debug)]
pub struct RenderedArtifact {
    name: String,
    buys: String,
    content: Content,
}

impl RenderedArtifact {
    /// Take ownership of a downloaded file.
    pub fn from_file(path: impl Into<PathBuf>, buys: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blueprint.png".to_string());
        Self {
            name,
            buys: buys.into(),
            content: Content::File(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, buys: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buys: buys.into(),
            content: Content::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buys(&self) -> &str {
        &self.buys
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            Content::File(path) => Some(path),
            Content::Memory(_) => None,
        }
    }

    pub fn bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match &self.content {
            Content::File(path) => std::fs::read(path).map(Cow::Owned),
            Content::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

impl Drop for RenderedArtifact {
    fn drop(&mut self) {
        if let Content::File(path) = &self.content {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed rendered artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove rendered artifact"),
            }
        }
    }
}

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub link: Option<String>,
}

/// Renders the personalized image for one recipient.
///
/// Implementations hold any exclusive session (browser, HTTP client) only for
/// the duration of a call.
pub trait Renderer: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderedArtifact, RenderError>;
}

/// Puts a rendered artifact into shared storage.
pub trait Uploader: Send + Sync {
    fn upload(&self, artifact: &RenderedArtifact, destination: &str) -> Result<UploadedFile, UploadError>;
}

/// Tells a recipient where their image is.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &RecipientKey, link: &str) -> Result<(), NotifyError>;
}
