//! Fraud reports (submission only, no detection logic).

use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudReportStatus {
    Pending,
}

impl FraudReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudReportStatus::Pending => "pending",
        }
    }
}

/// Report type used when the caller gives none
pub const DEFAULT_REPORT_TYPE: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudReport {
    pub id: String,
    pub user_id: UserId,
    pub report_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub status: FraudReportStatus,
    pub created_at: DateTime<Utc>,
}
