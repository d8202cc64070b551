use serde::{Serialize, Deserialize};
use serde_json::{json, Value};
use std::time::SystemTime;

/// Matter type bucketed into the community chart.
pub const COMMUNITY_MATTER: &str = "Community";

/// Lifecycle status of a report.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
}

impl ReportStatus {
    /// The opposite status. Responding flips the status rather than setting it.
    pub fn toggled(self) -> Self {
        match self {
            ReportStatus::Pending => ReportStatus::Resolved,
            ReportStatus::Resolved => ReportStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-submitted report, mirrored from the `reports` collection.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Collection key. Always taken from the key, never from the payload.
    pub id: String,
    /// Epoch millis, set at creation.
    pub created_at: u64,
    pub description: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    /// Categorical tag, e.g. "Community".
    pub matter_type: String,
    /// Reference to the submitting user.
    pub user_id: String,
    pub status: ReportStatus,
    /// Operator response text, set by the resolution workflow.
    pub response: Option<String>,
    /// Epoch millis of the last status toggle. Present once a report has been
    /// resolved at least once; toggling back to pending does not clear it.
    pub resolved_at: Option<u64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ReportPayload {
    #[serde(default)]
    created_at: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    matter_type: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    status: ReportStatus,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    resolved_at: Option<u64>,
}

impl Report {
    /// Materialize a report from a collection child.
    ///
    /// The collection key wins as identity even if the payload carries a field
    /// named `id`; unknown payload fields are ignored.
    pub fn from_record(key: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let payload: ReportPayload = serde_json::from_value(value.clone())?;
        Ok(Self {
            id: key.to_string(),
            created_at: payload.created_at,
            description: payload.description,
            email: payload.email,
            phone: payload.phone,
            name: payload.name,
            matter_type: payload.matter_type,
            user_id: payload.user_id,
            status: payload.status,
            response: payload.response,
            resolved_at: payload.resolved_at,
        })
    }
}

/// A user record. Only existence and the blocked flag matter to the console.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct User {
    pub id: String,
    pub blocked: bool,
}

#[derive(Deserialize, Default)]
struct UserPayload {
    #[serde(default)]
    blocked: bool,
}

impl User {
    /// Materialize a user from a collection child, key-first like [`Report`].
    pub fn from_record(key: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let payload: UserPayload = serde_json::from_value(value.clone())?;
        Ok(Self {
            id: key.to_string(),
            blocked: payload.blocked,
        })
    }
}

/// Notification left under `users/<uid>/notifications/<reportId>`.
///
/// Keyed by report id, so re-running the resolution workflow for the same
/// report overwrites instead of duplicating.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub response: String,
    pub created_at: u64,
    pub read: bool,
}

impl Notification {
    /// The notification written when an operator answers a report.
    pub fn report_response(report_id: &str, response: &str, created_at: u64) -> Self {
        Self {
            kind: "response".to_string(),
            message: format!("An operator has responded to your report {report_id}"),
            response: response.to_string(),
            created_at,
            read: false,
        }
    }

    /// JSON record shape stored in the remote collection.
    pub fn to_record(&self) -> Value {
        json!({
            "type": self.kind,
            "message": self.message,
            "response": self.response,
            "createdAt": self.created_at,
            "read": self.read,
        })
    }
}

/// Aggregate counters derived from the mirrored collections.
///
/// Each field is owned by its own subscription; the trio can be transiently
/// inconsistent across fields.
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: usize,
    pub total_reports: usize,
    pub resolved_reports: usize,
}

/// One bar of the community chart.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ChartEntry {
    pub name: String,
    pub reports: u32,
}

/// Project the report list into community chart entries.
///
/// One weight-1 entry per report with `matterType == "Community"`; reports
/// sharing a name stay separate entries.
pub fn community_chart(reports: &[Report]) -> Vec<ChartEntry> {
    reports
        .iter()
        .filter(|r| r.matter_type == COMMUNITY_MATTER)
        .map(|r| ChartEntry {
            name: r.name.clone(),
            reports: 1,
        })
        .collect()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
