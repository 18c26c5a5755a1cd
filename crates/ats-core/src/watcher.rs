//! Watcher persistence model.
//!
//! A watcher is a saved filter plus an action to invoke when a newly
//! created attestation matches. The data type lives here so storage
//! backends can persist it; the matching/dispatch engine is a separate
//! crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::attestation::AxFilter;

/// Kind of side effect a watcher drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// POST the script to the external python executor
    Python,
    /// POST the trigger payload to a URL
    Webhook,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Python => write!(f, "python"),
            ActionType::Webhook => write!(f, "webhook"),
        }
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" => Ok(ActionType::Python),
            "webhook" => Ok(ActionType::Webhook),
            other => Err(format!("unknown action type '{}'", other)),
        }
    }
}

/// A persisted watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watcher {
    pub id: String,
    pub name: String,
    pub filter: AxFilter,
    pub action_type: ActionType,
    /// Script text for python actions, URL for webhooks
    pub action_data: String,
    /// Token-bucket rate; zero means the watcher never fires
    pub max_fires_per_minute: u32,
    pub enabled: bool,

    #[serde(default)]
    pub fire_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_error: String,
    /// Unix ms of the most recent successful fire
    pub last_fired: Option<i64>,
}

impl Watcher {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        filter: AxFilter,
        action_type: ActionType,
        action_data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            filter,
            action_type,
            action_data: action_data.into(),
            max_fires_per_minute: 60,
            enabled: true,
            fire_count: 0,
            error_count: 0,
            last_error: String::new(),
            last_fired: None,
        }
    }
}
