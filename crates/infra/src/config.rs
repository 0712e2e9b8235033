//! Sender configuration loaded from YAML.
//!
//! ```yaml
//! email_list: fan@example.com,other@example.com
//! league_id_list: 1180303064879046656,1180303064879046657
//! team_id_list: 4,5
//! user_id_list:
//! skip_list:
//! disallowed_buys: 1-2-3,None
//! render:
//!   endpoint: https://render.example.com/infinite
//!   timeout_secs: 60
//! upload:
//!   kind: folder
//!   root: published
//!   public_base_url: https://cdn.example.com/blueprints
//! notify:
//!   endpoint: https://relay.example.com/v1/send
//!   sender: blueprints@example.com
//! retry:
//!   max_attempts: 2
//!   delay_ms: 500
//!   strategy: fixed
//! ```
//!
//! List fields accept a comma-separated string, a YAML sequence, or null.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_yaml::Value as YamlValue;
use thiserror::Error;

use blueprint_core::{ColumnLists, RecipientKey};
use blueprint_pipeline::{BackoffStrategy, RetryPolicy};

/// Environment variable that overrides `notify.api_token`.
pub const NOTIFY_TOKEN_ENV: &str = "BLUEPRINT_NOTIFY_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("missing config value: {0}")]
    Missing(&'static str),
}

fn scalar_text(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.trim().to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Null => Some(String::new()),
        _ => None,
    }
}

/// Accept `"a, b"`, `[a, b]`, a single scalar, or null.
fn list_field<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<YamlValue>::deserialize(deserializer)?;
    let list = match value {
        None | Some(YamlValue::Null) => Vec::new(),
        Some(YamlValue::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_text(item).ok_or_else(|| serde::de::Error::custom("list entries must be scalars"))
            })
            .collect::<Result<_, _>>()?,
        Some(other) => vec![
            scalar_text(&other).ok_or_else(|| serde::de::Error::custom("expected a list or a string"))?,
        ],
    };
    Ok(list)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Page that renders one blueprint from query parameters.
    pub endpoint: String,
    /// Upper bound for a single render/download.
    pub timeout_secs: u64,
    /// Where downloaded images are staged before upload.
    pub download_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4173/infinite".to_string(),
            timeout_secs: 60,
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadConfig {
    /// Copy into a directory that is published elsewhere.
    Folder {
        root: PathBuf,
        #[serde(default)]
        public_base_url: Option<String>,
    },
    /// `PUT` to an object-storage style endpoint.
    Http {
        endpoint: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig::Folder {
            root: PathBuf::from("published"),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub endpoint: Option<String>,
    pub sender: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Everything the mail relay needs, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub endpoint: String,
    pub sender: String,
    pub api_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Base delay before a retry.
    pub delay_ms: u64,
    /// Cap for growing strategies; defaults to `delay_ms`.
    pub max_delay_ms: Option<u64>,
    pub strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_ms: 500,
            max_delay_ms: None,
            strategy: BackoffStrategy::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.delay_ms);
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_millis(self.max_delay_ms.unwrap_or(self.delay_ms)).max(base_delay),
            strategy: self.strategy,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    #[serde(deserialize_with = "list_field")]
    pub email_list: Vec<String>,
    #[serde(deserialize_with = "list_field")]
    pub league_id_list: Vec<String>,
    #[serde(deserialize_with = "list_field")]
    pub team_id_list: Vec<String>,
    #[serde(deserialize_with = "list_field")]
    pub user_id_list: Vec<String>,
    #[serde(deserialize_with = "list_field")]
    pub skip_list: Vec<String>,
    #[serde(deserialize_with = "list_field")]
    pub disallowed_buys: Vec<String>,
    pub render: RenderConfig,
    pub upload: UploadConfig,
    pub notify: NotifyConfig,
    pub retry: RetryConfig,
}

impl SenderConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(format!("YAML parse error: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// The list fields as parallel columns for the work item store.
    pub fn columns(&self) -> ColumnLists {
        ColumnLists {
            keys: self.email_list.clone(),
            league_ids: self.league_id_list.clone(),
            team_ids: self.team_id_list.clone(),
            user_ids: self.user_id_list.clone(),
            disallowed_buys: self.disallowed_buys.clone(),
        }
    }

    /// Skip list entries that are valid keys; blanks are ignored.
    pub fn skip_keys(&self) -> Vec<RecipientKey> {
        self.skip_list
            .iter()
            .filter_map(|k| RecipientKey::parse(k).ok())
            .collect()
    }

    /// Validate notification settings, letting `env` supply the token.
    pub fn notify_settings(&self, env: impl Fn(&str) -> Option<String>) -> Result<NotifySettings, ConfigError> {
        let endpoint = self.notify.endpoint.clone().ok_or(ConfigError::Missing("notify.endpoint"))?;
        let sender = self.notify.sender.clone().ok_or(ConfigError::Missing("notify.sender"))?;
        let api_token = env(NOTIFY_TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.notify.api_token.clone())
            .ok_or(ConfigError::Missing("notify.api_token"))?;
        Ok(NotifySettings {
            endpoint,
            sender,
            api_token,
            timeout: Duration::from_secs(self.notify.timeout_secs.unwrap_or(30)),
        })
    }
}
