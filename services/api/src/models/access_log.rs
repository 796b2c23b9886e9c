//! Album access log models

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    View,
    Download,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessAction::View => "view",
            AccessAction::Download => "download",
        }
    }
}

/// Requester details recorded with every public access
#[derive(Debug, Clone, Default)]
pub struct AccessInfo {
    pub ip_address: String,
    pub user_agent: String,
}

/// Append-only access log row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: i64,
    pub album_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub action: String,
    pub photo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
