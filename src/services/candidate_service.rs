use std::sync::Arc;
use uuid::Uuid;

use crate::database::{CandidateStore, StoreTx};
use crate::dto::candidate_dto::{CreateCandidatePayload, ProfileUpdatePayload, UpdateCandidatePayload};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateDetail, CandidateStatus, NewCandidate};
use crate::models::derived_record::{DerivedKind, DerivedRecord};
use crate::models::patch::CandidatePatch;
use crate::services::{derived_records, skill_set, status_resolver};

/// Every write to a candidate goes through here: one store transaction per
/// call, committed only if all steps succeed.
#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn CandidateStore>,
}

impl CandidateService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn get_candidate(&self, id: i64) -> Result<CandidateDetail> {
        self.store
            .find_candidate(id)
            .await?
            .ok_or_else(|| Error::candidate_not_found(id))
    }

    pub async fn list_candidates(&self, status: Option<CandidateStatus>) -> Result<Vec<CandidateDetail>> {
        self.store.list_candidates(status).await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<CandidateDetail> {
        self.store
            .find_candidate_by_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("No candidate profile for this user".to_string()))
    }

    pub async fn derived_record(&self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>> {
        self.store.find_derived(kind, candidate_id).await
    }

    #[tracing::instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn create_candidate(
        &self,
        payload: CreateCandidatePayload,
        created_by: Option<Uuid>,
    ) -> Result<CandidateDetail> {
        let (candidate, skills) = payload.into_new_candidate(created_by)?;

        let mut tx = self.store.begin().await?;
        let result = create_in_tx(tx.as_mut(), &candidate, &skills).await;
        let created = finish(tx, result).await?;

        tracing::info!(
            candidate_id = created.candidate.id,
            status = %created.candidate.status,
            skills = created.skills.len(),
            "Candidate created"
        );
        Ok(created)
    }

    #[tracing::instrument(skip(self, payload))]
    pub async fn apply_update(&self, id: i64, payload: UpdateCandidatePayload) -> Result<CandidateDetail> {
        let patch = payload.into_patch()?;

        let mut tx = self.store.begin().await?;
        let result = update_in_tx(tx.as_mut(), id, &patch).await;
        finish(tx, result).await
    }

    /// Moves the candidate to `scheduled` through the regular update path and
    /// returns its connected record. Repeated calls return the same record.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self, id: i64) -> Result<DerivedRecord> {
        let patch = UpdateCandidatePayload::status(CandidateStatus::Scheduled).into_patch()?;

        let mut tx = self.store.begin().await?;
        let result = connect_in_tx(tx.as_mut(), id, &patch).await;
        finish(tx, result).await
    }

    /// Self-service update: the candidate is located by the owning user, not by id.
    #[tracing::instrument(skip(self, payload))]
    pub async fn update_profile(&self, user_id: Uuid, payload: ProfileUpdatePayload) -> Result<CandidateDetail> {
        let patch = UpdateCandidatePayload::from(payload).into_patch()?;

        let mut tx = self.store.begin().await?;
        let result = match tx.lock_candidate_by_user(user_id).await {
            Ok(Some(current)) => update_locked(tx.as_mut(), current, &patch).await,
            Ok(None) => Err(Error::NotFound("No candidate profile for this user".to_string())),
            Err(err) => Err(err),
        };
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_candidate(&self, id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result = delete_in_tx(tx.as_mut(), id).await;
        finish(tx, result).await?;

        tracing::info!(candidate_id = id, "Candidate deleted");
        Ok(())
    }
}

async fn finish<T: Send>(mut tx: Box<dyn StoreTx>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn create_in_tx(tx: &mut dyn StoreTx, candidate: &NewCandidate, skills: &[String]) -> Result<CandidateDetail> {
    if tx.email_in_use(&candidate.email, None).await? {
        return Err(Error::DuplicateEmail(candidate.email.clone()));
    }
    let row = tx.insert_candidate(candidate).await?;

    // A fresh row has no derived records yet, so reconcile as if coming from pending.
    let plan = status_resolver::resolve(CandidateStatus::Pending, Some(row.status));
    derived_records::apply_plan(tx, row.id, &plan).await?;

    let skills = skill_set::replace(tx, row.id, skills).await?;
    Ok(CandidateDetail { candidate: row, skills })
}

async fn update_in_tx(tx: &mut dyn StoreTx, id: i64, patch: &CandidatePatch) -> Result<CandidateDetail> {
    let current = tx
        .lock_candidate(id)
        .await?
        .ok_or_else(|| Error::candidate_not_found(id))?;
    update_locked(tx, current, patch).await
}

async fn update_locked(tx: &mut dyn StoreTx, current: Candidate, patch: &CandidatePatch) -> Result<CandidateDetail> {
    let id = current.id;

    if let Some(email) = patch.email.as_set() {
        if *email != current.email && tx.email_in_use(email, Some(id)).await? {
            return Err(Error::DuplicateEmail(email.clone()));
        }
    }

    let plan = status_resolver::resolve(current.status, patch.status.as_set().copied());
    derived_records::apply_plan(tx, id, &plan).await?;
    if plan.changes_status() {
        tracing::info!(candidate_id = id, from = %plan.from, to = ?plan.to, "Candidate status changed");
    }

    let candidate = if patch.differs_from(&current) {
        tx.update_candidate(id, patch).await?
    } else {
        current
    };

    let skills = match patch.skills.as_set() {
        Some(names) => skill_set::replace(tx, id, names).await?,
        None => tx.list_skills(id).await?,
    };

    Ok(CandidateDetail { candidate, skills })
}

async fn connect_in_tx(tx: &mut dyn StoreTx, id: i64, patch: &CandidatePatch) -> Result<DerivedRecord> {
    update_in_tx(tx, id, patch).await?;
    tx.find_derived(DerivedKind::Connected, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Connected record missing for candidate {}", id)))
}

async fn delete_in_tx(tx: &mut dyn StoreTx, id: i64) -> Result<()> {
    if tx.lock_candidate(id).await?.is_none() || !tx.delete_candidate(id).await? {
        return Err(Error::candidate_not_found(id));
    }
    Ok(())
}
