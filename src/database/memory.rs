//! In-memory candidate store.
//!
//! Used when no `DATABASE_URL` is configured and by the test suites. A
//! transaction takes the store-wide async mutex, works on a private copy of
//! the tables, and publishes the copy on commit; rollback or drop discards it.
//! Writers are therefore fully serialized, which is stricter than the row
//! locks the Postgres store takes.
//! Updates to different candidates block each other here; only the Postgres
//! store lets them proceed independently.
//!
//! The same unique constraints as the SQL schema are enforced: candidate email,
//! candidate `user_id`, `(candidate_id, name)` on skills, and one derived row
//! per candidate and kind.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{CandidateStore, StoreTx};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateDetail, CandidateStatus, NewCandidate};
use crate::models::derived_record::{DerivedKind, DerivedRecord};
use crate::models::patch::{CandidatePatch, Patch};
use crate::models::skill::Skill;
use sqlx::types::Json;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_candidate_id: i64,
    next_skill_id: i64,
    next_derived_id: i64,
    candidates: BTreeMap<i64, Candidate>,
    skills: Vec<Skill>,
    rejected: BTreeMap<i64, DerivedRecord>,
    connected: BTreeMap<i64, DerivedRecord>,
}

impl Tables {
    fn derived(&self, kind: DerivedKind) -> &BTreeMap<i64, DerivedRecord> {
        match kind {
            DerivedKind::Rejected => &self.rejected,
            DerivedKind::Connected => &self.connected,
        }
    }

    fn derived_mut(&mut self, kind: DerivedKind) -> &mut BTreeMap<i64, DerivedRecord> {
        match kind {
            DerivedKind::Rejected => &mut self.rejected,
            DerivedKind::Connected => &mut self.connected,
        }
    }

    fn skills_of(&self, candidate_id: i64) -> Vec<Skill> {
        self.skills
            .iter()
            .filter(|s| s.candidate_id == candidate_id)
            .cloned()
            .collect()
    }

    fn detail(&self, candidate: &Candidate) -> CandidateDetail {
        CandidateDetail {
            candidate: candidate.clone(),
            skills: self.skills_of(candidate.id),
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.candidates
            .values()
            .any(|c| c.email == email && Some(c.id) != except)
    }

    fn require_candidate(&self, candidate_id: i64, table: &str) -> Result<()> {
        if self.candidates.contains_key(&candidate_id) {
            Ok(())
        } else {
            Err(Error::TransactionFailure(format!(
                "insert on {} violates foreign key: candidate {} does not exist",
                table, candidate_id
            )))
        }
    }
}

/// Row counts per table, for tests that assert nothing leaked or was left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub candidates: usize,
    pub skills: usize,
    pub rejected: usize,
    pub connected: usize,
}

#[derive(Clone, Default)]
pub struct MemoryCandidateStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_counts(&self) -> RowCounts {
        let tables = self.tables.lock().await;
        RowCounts {
            candidates: tables.candidates.len(),
            skills: tables.skills.len(),
            rejected: tables.rejected.len(),
            connected: tables.connected.len(),
        }
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryStoreTx {
            guard: Some(guard),
            work,
        }))
    }

    async fn find_candidate(&self, id: i64) -> Result<Option<CandidateDetail>> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.get(&id).map(|c| tables.detail(c)))
    }

    async fn find_candidate_by_user(&self, user_id: Uuid) -> Result<Option<CandidateDetail>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .values()
            .find(|c| c.user_id == Some(user_id))
            .map(|c| tables.detail(c)))
    }

    async fn list_candidates(&self, status: Option<CandidateStatus>) -> Result<Vec<CandidateDetail>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<&Candidate> = tables
            .candidates
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .collect();
        rows.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then(b.id.cmp(&a.id)));
        Ok(rows.into_iter().map(|c| tables.detail(c)).collect())
    }

    async fn find_derived(&self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.derived(kind).get(&candidate_id).cloned())
    }
}

pub struct MemoryStoreTx {
    guard: Option<OwnedMutexGuard<Tables>>,
    work: Tables,
}

impl MemoryStoreTx {
    fn tables(&mut self) -> Result<&mut Tables> {
        if self.guard.is_none() {
            return Err(Error::TransactionFailure(
                "transaction already finished".to_string(),
            ));
        }
        Ok(&mut self.work)
    }
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn lock_candidate(&mut self, id: i64) -> Result<Option<Candidate>> {
        Ok(self.tables()?.candidates.get(&id).cloned())
    }

    async fn lock_candidate_by_user(&mut self, user_id: Uuid) -> Result<Option<Candidate>> {
        Ok(self
            .tables()?
            .candidates
            .values()
            .find(|c| c.user_id == Some(user_id))
            .cloned())
    }

    async fn email_in_use(&mut self, email: &str, except: Option<i64>) -> Result<bool> {
        Ok(self.tables()?.email_taken(email, except))
    }

    async fn insert_candidate(&mut self, candidate: &NewCandidate) -> Result<Candidate> {
        let tables = self.tables()?;
        if tables.email_taken(&candidate.email, None) {
            return Err(Error::DuplicateEmail(candidate.email.clone()));
        }
        if let Some(user_id) = candidate.user_id {
            if tables.candidates.values().any(|c| c.user_id == Some(user_id)) {
                return Err(Error::TransactionFailure(format!(
                    "duplicate key value violates unique constraint candidates_user_id_key ({})",
                    user_id
                )));
            }
        }

        tables.next_candidate_id += 1;
        let now = Utc::now();
        let row = Candidate {
            id: tables.next_candidate_id,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            role: candidate.role.clone(),
            status: candidate.status,
            score: candidate.score,
            experience: Json(candidate.experience.clone()),
            score_breakdown: Json(candidate.score_breakdown.clone()),
            photo_url: candidate.photo_url.clone(),
            created_by: candidate.created_by,
            user_id: candidate.user_id,
            applied_at: now,
            updated_at: now,
        };
        tables.candidates.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_candidate(&mut self, id: i64, patch: &CandidatePatch) -> Result<Candidate> {
        let tables = self.tables()?;
        if let Patch::Set(email) = &patch.email {
            if tables.email_taken(email, Some(id)) {
                return Err(Error::DuplicateEmail(email.clone()));
            }
        }
        let row = tables
            .candidates
            .get_mut(&id)
            .ok_or_else(|| Error::candidate_not_found(id))?;

        if let Patch::Set(name) = &patch.name {
            row.name = name.clone();
        }
        if let Patch::Set(email) = &patch.email {
            row.email = email.clone();
        }
        if let Patch::Set(phone) = &patch.phone {
            row.phone = phone.clone();
        }
        if let Patch::Set(role) = &patch.role {
            row.role = role.clone();
        }
        if let Patch::Set(status) = &patch.status {
            row.status = *status;
        }
        if let Patch::Set(score) = &patch.score {
            row.score = *score;
        }
        if let Patch::Set(experience) = &patch.experience {
            row.experience = Json(experience.clone());
        }
        if let Patch::Set(breakdown) = &patch.score_breakdown {
            row.score_breakdown = Json(breakdown.clone());
        }
        if let Patch::Set(photo_url) = &patch.photo_url {
            row.photo_url = photo_url.clone();
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_candidate(&mut self, id: i64) -> Result<bool> {
        let tables = self.tables()?;
        if tables.candidates.remove(&id).is_none() {
            return Ok(false);
        }
        tables.skills.retain(|s| s.candidate_id != id);
        tables.rejected.remove(&id);
        tables.connected.remove(&id);
        Ok(true)
    }

    async fn ensure_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<DerivedRecord> {
        let tables = self.tables()?;
        if let Some(existing) = tables.derived(kind).get(&candidate_id) {
            return Ok(existing.clone());
        }
        tables.require_candidate(candidate_id, kind.table())?;

        tables.next_derived_id += 1;
        let record = DerivedRecord {
            id: tables.next_derived_id,
            candidate_id,
            created_at: Utc::now(),
        };
        tables.derived_mut(kind).insert(candidate_id, record.clone());
        Ok(record)
    }

    async fn remove_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<bool> {
        Ok(self
            .tables()?
            .derived_mut(kind)
            .remove(&candidate_id)
            .is_some())
    }

    async fn find_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>> {
        Ok(self.tables()?.derived(kind).get(&candidate_id).cloned())
    }

    async fn clear_skills(&mut self, candidate_id: i64) -> Result<u64> {
        let tables = self.tables()?;
        let before = tables.skills.len();
        tables.skills.retain(|s| s.candidate_id != candidate_id);
        Ok((before - tables.skills.len()) as u64)
    }

    async fn insert_skill(&mut self, candidate_id: i64, name: &str) -> Result<Skill> {
        let tables = self.tables()?;
        tables.require_candidate(candidate_id, "candidate_skills")?;
        if tables
            .skills
            .iter()
            .any(|s| s.candidate_id == candidate_id && s.name == name)
        {
            return Err(Error::TransactionFailure(format!(
                "duplicate key value violates unique constraint candidate_skills_candidate_name_key ({}, {})",
                candidate_id, name
            )));
        }

        tables.next_skill_id += 1;
        let skill = Skill {
            id: tables.next_skill_id,
            candidate_id,
            name: name.to_string(),
        };
        tables.skills.push(skill.clone());
        Ok(skill)
    }

    async fn list_skills(&mut self, candidate_id: i64) -> Result<Vec<Skill>> {
        Ok(self.tables()?.skills_of(candidate_id))
    }

    async fn commit(&mut self) -> Result<()> {
        let mut guard = self.guard.take().ok_or_else(|| {
            Error::TransactionFailure("transaction already finished".to_string())
        })?;
        *guard = std::mem::take(&mut self.work);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.guard = None;
        self.work = Tables::default();
        Ok(())
    }
}
