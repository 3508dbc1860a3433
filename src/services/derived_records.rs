use crate::database::StoreTx;
use crate::error::Result;
use crate::models::derived_record::DerivedKind;
use crate::services::status_resolver::{RecordAction, TransitionPlan};

/// Applies the derived-record half of a [`TransitionPlan`] inside `tx`.
///
/// Both operations are idempotent, so replaying a plan (or connecting an
/// already connected candidate) leaves exactly one row per kind.
pub async fn apply_plan(tx: &mut dyn StoreTx, candidate_id: i64, plan: &TransitionPlan) -> Result<()> {
    for kind in [DerivedKind::Rejected, DerivedKind::Connected] {
        match plan.action_for(kind) {
            RecordAction::Ensure => {
                let record = tx.ensure_derived(kind, candidate_id).await?;
                tracing::debug!(candidate_id, %kind, record_id = record.id, "Derived record ensured");
            }
            RecordAction::Remove => {
                if tx.remove_derived(kind, candidate_id).await? {
                    tracing::debug!(candidate_id, %kind, "Derived record removed");
                }
            }
            RecordAction::Untouched => {}
        }
    }
    Ok(())
}
