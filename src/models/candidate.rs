use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::models::skill::Skill;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Qualified,
    Scheduled,
    Rejected,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 4] = [
        CandidateStatus::Pending,
        CandidateStatus::Qualified,
        CandidateStatus::Scheduled,
        CandidateStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Qualified => "qualified",
            CandidateStatus::Scheduled => "scheduled",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandidateStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Unknown candidate status '{}' (expected one of pending, qualified, scheduled, rejected)",
                    s
                ))
            })
    }
}

impl TryFrom<String> for CandidateStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    #[sqlx(try_from = "String")]
    pub status: CandidateStatus,
    pub score: f64,
    pub experience: Json<Vec<JsonValue>>,
    pub score_breakdown: Json<BTreeMap<String, f64>>,
    pub photo_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A candidate row together with its skill set, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub skills: Vec<Skill>,
}

impl CandidateDetail {
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Validated insert for a new candidate row. Skills are inserted separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub status: CandidateStatus,
    pub score: f64,
    pub experience: Vec<JsonValue>,
    pub score_breakdown: BTreeMap<String, f64>,
    pub photo_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub user_id: Option<Uuid>,
}
