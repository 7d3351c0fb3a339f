use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The tuple handed to whatever consumes alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub headline: String,
    pub cluster_id: String,
    pub emitted_at: DateTime<Utc>,
}
