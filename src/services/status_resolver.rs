//! Decides which derived records a status change requires.
//!
//! The rejected and connected side tables mirror `candidates.status`:
//! a rejected row exists iff the candidate is `rejected`, a connected row
//! iff it is `scheduled`. [`resolve`] is the only place those rules live;
//! every write path that can touch `status` goes through it.

use serde::Serialize;

use crate::models::candidate::CandidateStatus;
use crate::models::derived_record::DerivedKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    /// Create if absent.
    Ensure,
    /// Delete if present.
    Remove,
    Untouched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub from: CandidateStatus,
    pub to: Option<CandidateStatus>,
    pub rejected: RecordAction,
    pub connected: RecordAction,
}

impl TransitionPlan {
    pub fn action_for(&self, kind: DerivedKind) -> RecordAction {
        match kind {
            DerivedKind::Rejected => self.rejected,
            DerivedKind::Connected => self.connected,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.rejected == RecordAction::Untouched && self.connected == RecordAction::Untouched
    }

    /// Whether the status value itself changes.
    pub fn changes_status(&self) -> bool {
        self.to.map_or(false, |to| to != self.from)
    }
}

/// `requested` is `None` when the caller did not supply a status at all.
pub fn resolve(current: CandidateStatus, requested: Option<CandidateStatus>) -> TransitionPlan {
    let Some(target) = requested else {
        return TransitionPlan {
            from: current,
            to: None,
            rejected: RecordAction::Untouched,
            connected: RecordAction::Untouched,
        };
    };

    let rejected = if target == CandidateStatus::Rejected {
        RecordAction::Ensure
    } else {
        RecordAction::Remove
    };
    let connected = if target == CandidateStatus::Scheduled {
        RecordAction::Ensure
    } else {
        RecordAction::Remove
    };

    TransitionPlan {
        from: current,
        to: Some(target),
        rejected,
        connected,
    }
}
