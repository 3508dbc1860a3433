//! Storage seam for the candidate engine.
//!
//! [`CandidateStore`] hands out transactions and serves read-only queries;
//! [`StoreTx`] is the set of primitives the update coordinator composes inside
//! one transaction. Dropping a [`StoreTx`] without calling
//! [`StoreTx::commit`] discards every change made through it.
//!
//! Implementations:
//! - [`postgres::PgCandidateStore`]: production, row locks via `SELECT ... FOR UPDATE`
//! - [`memory::MemoryCandidateStore`]: development and tests, one writer at a time

pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::candidate::{Candidate, CandidateDetail, CandidateStatus, NewCandidate};
use crate::models::derived_record::{DerivedKind, DerivedRecord};
use crate::models::patch::CandidatePatch;
use crate::models::skill::Skill;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Short name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    async fn find_candidate(&self, id: i64) -> Result<Option<CandidateDetail>>;

    async fn find_candidate_by_user(&self, user_id: Uuid) -> Result<Option<CandidateDetail>>;

    /// Newest `applied_at` first.
    async fn list_candidates(&self, status: Option<CandidateStatus>) -> Result<Vec<CandidateDetail>>;

    async fn find_derived(&self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreTx: Send {
    /// Loads the candidate row and holds a write lock on it until the transaction ends.
    async fn lock_candidate(&mut self, id: i64) -> Result<Option<Candidate>>;

    async fn lock_candidate_by_user(&mut self, user_id: Uuid) -> Result<Option<Candidate>>;

    /// Whether any candidate other than `except` already uses `email`.
    async fn email_in_use(&mut self, email: &str, except: Option<i64>) -> Result<bool>;

    async fn insert_candidate(&mut self, candidate: &NewCandidate) -> Result<Candidate>;

    /// Writes the row-level fields of `patch` and refreshes `updated_at`. Skills are ignored.
    async fn update_candidate(&mut self, id: i64, patch: &CandidatePatch) -> Result<Candidate>;

    /// Returns false when no row matched.
    async fn delete_candidate(&mut self, id: i64) -> Result<bool>;

    /// Create-if-absent. Returns the existing row untouched when one is already there.
    async fn ensure_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<DerivedRecord>;

    /// Delete-if-present. Returns whether a row was removed.
    async fn remove_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<bool>;

    async fn find_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>>;

    async fn clear_skills(&mut self, candidate_id: i64) -> Result<u64>;

    async fn insert_skill(&mut self, candidate_id: i64, name: &str) -> Result<Skill>;

    async fn list_skills(&mut self, candidate_id: i64) -> Result<Vec<Skill>>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
