use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// The two side tables whose rows mirror `candidates.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedKind {
    /// Present iff the candidate is `rejected`.
    Rejected,
    /// Present iff the candidate is `scheduled`.
    Connected,
}

impl DerivedKind {
    pub fn table(&self) -> &'static str {
        match self {
            DerivedKind::Rejected => "rejected_candidates",
            DerivedKind::Connected => "connected_candidates",
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedKind::Rejected => f.write_str("rejected"),
            DerivedKind::Connected => f.write_str("connected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DerivedRecord {
    pub id: i64,
    pub candidate_id: i64,
    pub created_at: DateTime<Utc>,
}
