//! Work items: one recipient's render/upload/notify parameters plus the
//! result fields the pipeline fills in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{LeagueId, RecipientKey, TeamId, UserId};

/// Lifecycle status of a work item as seen by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

/// Parameters needed to build a render request.
///
/// Any of them may be missing in the input; [`RecipientParams::render_query`]
/// decides whether enough is present to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientParams {
    pub league_id: Option<LeagueId>,
    pub team_id: Option<TeamId>,
    pub user_id: Option<UserId>,
    /// Player ids that must not be suggested as buys again.
    #[serde(default)]
    pub disallowed_buys: Vec<String>,
}

impl RecipientParams {
    /// A league plus a team or user id is the minimum to identify a roster.
    pub fn has_identifiers(&self) -> bool {
        self.league_id.is_some() && (self.team_id.is_some() || self.user_id.is_some())
    }

    /// Query parameters for the render page, or `None` when the roster
    /// cannot be identified. A team id wins over a user id.
    pub fn render_query(&self) -> Option<BTreeMap<String, String>> {
        let league_id = self.league_id.as_ref()?;
        let mut query = BTreeMap::new();
        query.insert("leagueId".to_string(), league_id.to_string());
        match (&self.team_id, &self.user_id) {
            (Some(team), _) => {
                query.insert("teamId".to_string(), team.to_string());
            }
            (None, Some(user)) => {
                query.insert("userId".to_string(), user.to_string());
            }
            (None, None) => return None,
        }
        query.insert("disallowedBuys".to_string(), self.disallowed_buys.join(","));
        Some(query)
    }
}

/// Parse the `a-b-c` disallowed-buys form used in list configs.
///
/// Blank input and the literal `None` mean "nothing disallowed".
pub fn parse_disallowed_buys(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return Vec::new();
    }
    trimmed
        .split(['-', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// What a successful pipeline pass produced for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedResult {
    /// Buy-identifier string scraped from the rendered page.
    pub buys: String,
    /// Storage id of the uploaded image.
    pub file_id: String,
    /// Shareable link, when the storage backend produced one.
    pub link: Option<String>,
    pub notified: bool,
}

/// One recipient's unit of work.
///
/// Identity (`key`) and parameters are fixed at load time; only `status`
/// and `result` change while the batch runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    key: RecipientKey,
    params: RecipientParams,
    status: ItemStatus,
    result: Option<RenderedResult>,
}

impl WorkItem {
    pub fn new(key: RecipientKey, params: RecipientParams) -> Self {
        Self {
            key,
            params,
            status: ItemStatus::Pending,
            result: None,
        }
    }

    pub fn key(&self) -> &RecipientKey {
        &self.key
    }

    pub fn params(&self) -> &RecipientParams {
        &self.params
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn result(&self) -> Option<&RenderedResult> {
        self.result.as_ref()
    }

    pub fn mark_succeeded(&mut self, result: RenderedResult) {
        self.status = ItemStatus::Succeeded;
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self) {
        self.status = ItemStatus::Failed;
    }

    pub fn mark_skipped(&mut self) {
        self.status = ItemStatus::Skipped;
    }

    /// Replace the disallowed buys (carry-forward from a prior run).
    pub fn set_disallowed_buys(&mut self, buys: Vec<String>) {
        self.params.disallowed_buys = buys;
    }
}
