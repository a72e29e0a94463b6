use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the audit trail kept by the logging service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppLog {
    pub id: String,
    pub action: String,
    pub group_id: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
