//! Sleeper user resolution: username → user id, plus league membership.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

pub const SLEEPER_API: &str = "https://api.sleeper.app/v1";

#[derive(Debug, Error)]
pub enum SleeperError {
    #[error("sleeper request failed: {0}")]
    Http(String),

    #[error("unexpected sleeper response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Found(String),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Member,
    NotMember,
    InvalidLeague,
    /// The user could not be resolved, or the rosters could not be read.
    Unknown,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s.trim().to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a string or number, got {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolveRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub sleeper_username: String,
    #[serde(deserialize_with = "string_or_number")]
    pub league_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub sleeper_username: String,
    pub user_id: Option<String>,
    pub league_id: String,
    pub in_league: Membership,
}

/// Decode a `/user/<name>` body. A literal `null` means no such user.
pub fn parse_user_body(body: &str) -> Result<UserLookup, SleeperError> {
    let value: JsonValue = serde_json::from_str(body).map_err(|e| SleeperError::Decode(e.to_string()))?;
    let user_id = match &value {
        JsonValue::Null => None,
        JsonValue::Object(map) => match map.get("user_id") {
            Some(JsonValue::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(JsonValue::Number(id)) => Some(id.to_string()),
            _ => None,
        },
        other => return Err(SleeperError::Decode(format!("user body is not an object: {other}"))),
    };
    Ok(user_id.map_or(UserLookup::NotFound, UserLookup::Found))
}

/// Decode a `/league/<id>/rosters` body and look for `user_id` as an owner.
pub fn parse_rosters_body(body: &str, user_id: &str) -> Result<Membership, SleeperError> {
    let value: JsonValue = serde_json::from_str(body).map_err(|e| SleeperError::Decode(e.to_string()))?;
    let rosters = match value {
        JsonValue::Null => return Ok(Membership::InvalidLeague),
        JsonValue::Array(rosters) => rosters,
        other => return Err(SleeperError::Decode(format!("rosters body is not a list: {other}"))),
    };
    let member = rosters
        .iter()
        .any(|roster| roster.get("owner_id").and_then(JsonValue::as_str) == Some(user_id));
    Ok(if member { Membership::Member } else { Membership::NotMember })
}

#[derive(Debug, Clone)]
pub struct SleeperClient {
    base_url: String,
    client: Client,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SleeperError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SleeperError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get_text(&self, path: &str) -> Result<String, SleeperError> {
        let resp = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .send()
            .map_err(|e| SleeperError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SleeperError::Http(status.to_string()));
        }
        resp.text().map_err(|e| SleeperError::Http(e.to_string()))
    }

    pub fn lookup_user(&self, username: &str) -> Result<UserLookup, SleeperError> {
        parse_user_body(&self.get_text(&format!("user/{username}"))?)
    }

    pub fn membership(&self, user_id: &str, league_id: &str) -> Result<Membership, SleeperError> {
        parse_rosters_body(&self.get_text(&format!("league/{league_id}/rosters"))?, user_id)
    }

    /// Resolve every request, looking each distinct username up once.
    /// Per-row failures are logged and reported as `Unknown`.
    pub fn resolve(&self, requests: &[ResolveRequest]) -> Vec<Resolution> {
        let mut users: HashMap<&str, Option<String>> = HashMap::new();
        for request in requests {
            let name = request.sleeper_username.as_str();
            if users.contains_key(name) {
                continue;
            }
            let user_id = match self.lookup_user(name) {
                Ok(UserLookup::Found(id)) => Some(id),
                Ok(UserLookup::NotFound) => {
                    info!(username = name, "sleeper user not found");
                    None
                }
                Err(e) => {
                    warn!(username = name, error = %e, "sleeper user lookup failed");
                    None
                }
            };
            users.insert(name, user_id);
        }

        requests
            .iter()
            .map(|request| {
                let user_id = users.get(request.sleeper_username.as_str()).cloned().flatten();
                let in_league = match &user_id {
                    None => Membership::Unknown,
                    Some(id) => self.membership(id, &request.league_id).unwrap_or_else(|e| {
                        warn!(league_id = %request.league_id, error = %e, "roster lookup failed");
                        Membership::Unknown
                    }),
                };
                Resolution {
                    sleeper_username: request.sleeper_username.clone(),
                    user_id,
                    league_id: request.league_id.clone(),
                    in_league,
                }
            })
            .collect()
    }
}
