use crate::database::StoreTx;
use crate::error::Result;
use crate::models::skill::Skill;

/// Replaces the whole skill set of a candidate with `names`, in order.
///
/// Runs on the caller's transaction, so readers never see the empty
/// intermediate state. A duplicate name trips the per-candidate unique
/// constraint and fails the surrounding transaction.
pub async fn replace(tx: &mut dyn StoreTx, candidate_id: i64, names: &[String]) -> Result<Vec<Skill>> {
    let removed = tx.clear_skills(candidate_id).await?;

    let mut skills = Vec::with_capacity(names.len());
    for name in names {
        skills.push(tx.insert_skill(candidate_id, name).await?);
    }

    tracing::debug!(candidate_id, removed, inserted = skills.len(), "Skill set replaced");
    Ok(skills)
}
