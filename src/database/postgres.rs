use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{CandidateStore, StoreTx};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateDetail, CandidateStatus, NewCandidate};
use crate::models::derived_record::{DerivedKind, DerivedRecord};
use crate::models::patch::{CandidatePatch, Patch};
use crate::models::skill::Skill;

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, role, status, score, experience, \
     score_breakdown, photo_url, created_by, user_id, applied_at, updated_at";

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn with_skills(&self, candidates: Vec<Candidate>) -> Result<Vec<CandidateDetail>> {
        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        let skills = sqlx::query_as::<_, Skill>(
            "SELECT id, candidate_id, name FROM candidate_skills WHERE candidate_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_candidate: HashMap<i64, Vec<Skill>> = HashMap::new();
        for skill in skills {
            by_candidate.entry(skill.candidate_id).or_default().push(skill);
        }

        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let skills = by_candidate.remove(&candidate.id).unwrap_or_default();
                CandidateDetail { candidate, skills }
            })
            .collect())
    }

    async fn single(&self, candidate: Option<Candidate>) -> Result<Option<CandidateDetail>> {
        match candidate {
            Some(c) => Ok(self.with_skills(vec![c]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx: Some(tx) }))
    }

    async fn find_candidate(&self, id: i64) -> Result<Option<CandidateDetail>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.single(candidate).await
    }

    async fn find_candidate_by_user(&self, user_id: Uuid) -> Result<Option<CandidateDetail>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE user_id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        self.single(candidate).await
    }

    async fn list_candidates(&self, status: Option<CandidateStatus>) -> Result<Vec<CandidateDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM candidates", CANDIDATE_COLUMNS));
        if let Some(status) = status {
            query.push(" WHERE status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY applied_at DESC, id DESC");

        let candidates = query
            .build_query_as::<Candidate>()
            .fetch_all(&self.pool)
            .await?;
        self.with_skills(candidates).await
    }

    async fn find_derived(&self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>> {
        let record = sqlx::query_as::<_, DerivedRecord>(&format!(
            "SELECT id, candidate_id, created_at FROM {} WHERE candidate_id = $1",
            kind.table()
        ))
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

pub struct PgStoreTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTx {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.tx
            .as_mut()
            .map(|tx| &mut **tx)
            .ok_or_else(|| Error::TransactionFailure("transaction already finished".to_string()))
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_candidate(&mut self, id: i64) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = $1 FOR UPDATE",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(candidate)
    }

    async fn lock_candidate_by_user(&mut self, user_id: Uuid) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE user_id = $1 FOR UPDATE",
            CANDIDATE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(candidate)
    }

    async fn email_in_use(&mut self, email: &str, except: Option<i64>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM candidates WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(self.conn()?)
        .await?;
        Ok(exists)
    }

    async fn insert_candidate(&mut self, candidate: &NewCandidate) -> Result<Candidate> {
        let row = sqlx::query_as::<_, Candidate>(&format!(
            r#"
            INSERT INTO candidates (
                name, email, phone, role, status, score,
                experience, score_breakdown, photo_url, created_by, user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.role)
        .bind(candidate.status.as_str())
        .bind(candidate.score)
        .bind(Json(candidate.experience.clone()))
        .bind(Json(candidate.score_breakdown.clone()))
        .bind(&candidate.photo_url)
        .bind(candidate.created_by)
        .bind(candidate.user_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn update_candidate(&mut self, id: i64, patch: &CandidatePatch) -> Result<Candidate> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE candidates SET updated_at = NOW()");
        if let Patch::Set(name) = &patch.name {
            query.push(", name = ").push_bind(name.clone());
        }
        if let Patch::Set(email) = &patch.email {
            query.push(", email = ").push_bind(email.clone());
        }
        if let Patch::Set(phone) = &patch.phone {
            query.push(", phone = ").push_bind(phone.clone());
        }
        if let Patch::Set(role) = &patch.role {
            query.push(", role = ").push_bind(role.clone());
        }
        if let Patch::Set(status) = &patch.status {
            query.push(", status = ").push_bind(status.as_str());
        }
        if let Patch::Set(score) = &patch.score {
            query.push(", score = ").push_bind(*score);
        }
        if let Patch::Set(experience) = &patch.experience {
            query.push(", experience = ").push_bind(Json(experience.clone()));
        }
        if let Patch::Set(breakdown) = &patch.score_breakdown {
            query.push(", score_breakdown = ").push_bind(Json(breakdown.clone()));
        }
        if let Patch::Set(photo_url) = &patch.photo_url {
            query.push(", photo_url = ").push_bind(photo_url.clone());
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING ").push(CANDIDATE_COLUMNS);

        query
            .build_query_as::<Candidate>()
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| Error::candidate_not_found(id))
    }

    async fn delete_candidate(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ensure_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<DerivedRecord> {
        let conn = self.conn()?;
        sqlx::query(&format!(
            "INSERT INTO {} (candidate_id) VALUES ($1) ON CONFLICT (candidate_id) DO NOTHING",
            kind.table()
        ))
        .bind(candidate_id)
        .execute(&mut *conn)
        .await?;

        let record = sqlx::query_as::<_, DerivedRecord>(&format!(
            "SELECT id, candidate_id, created_at FROM {} WHERE candidate_id = $1",
            kind.table()
        ))
        .bind(candidate_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(record)
    }

    async fn remove_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE candidate_id = $1", kind.table()))
            .bind(candidate_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_derived(&mut self, kind: DerivedKind, candidate_id: i64) -> Result<Option<DerivedRecord>> {
        let record = sqlx::query_as::<_, DerivedRecord>(&format!(
            "SELECT id, candidate_id, created_at FROM {} WHERE candidate_id = $1",
            kind.table()
        ))
        .bind(candidate_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(record)
    }

    async fn clear_skills(&mut self, candidate_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM candidate_skills WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_skill(&mut self, candidate_id: i64, name: &str) -> Result<Skill> {
        let skill = sqlx::query_as::<_, Skill>(
            "INSERT INTO candidate_skills (candidate_id, name) VALUES ($1, $2) RETURNING id, candidate_id, name",
        )
        .bind(candidate_id)
        .bind(name)
        .fetch_one(self.conn()?)
        .await?;
        Ok(skill)
    }

    async fn list_skills(&mut self, candidate_id: i64) -> Result<Vec<Skill>> {
        let skills = sqlx::query_as::<_, Skill>(
            "SELECT id, candidate_id, name FROM candidate_skills WHERE candidate_id = $1 ORDER BY id",
        )
        .bind(candidate_id)
        .fetch_all(self.conn()?)
        .await?;
        Ok(skills)
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::TransactionFailure("transaction already finished".to_string()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
