use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::error::{Error, Result};
use crate::models::candidate::{CandidateStatus, NewCandidate};
use crate::models::patch::{null_as_absent, CandidatePatch, Patch};
use crate::utils::validation::{non_blank, validate};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub role: String,
    pub status: Option<String>,
    pub score: Option<JsonValue>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience: Option<Vec<JsonValue>>,
    pub score_breakdown: Option<BTreeMap<String, f64>>,
    pub photo_url: Option<String>,
    pub user_id: Option<Uuid>,
}

impl CreateCandidatePayload {
    /// Validates the payload and splits it into the candidate row and its initial skills.
    pub fn into_new_candidate(self, created_by: Option<Uuid>) -> Result<(NewCandidate, Vec<String>)> {
        validate(&self)?;
        let name = non_blank("name", self.name)?;
        let role = non_blank("role", self.role)?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<CandidateStatus>)
            .transpose()?
            .unwrap_or_default();
        let score = match self.score {
            None | Some(JsonValue::Null) => 0.0,
            Some(raw) => parse_score(&raw)?,
        };
        let skills = normalize_skills(self.skills)?;

        let candidate = NewCandidate {
            name,
            email: self.email.trim().to_string(),
            phone: self.phone,
            role,
            status,
            score,
            experience: self.experience.unwrap_or_default(),
            score_breakdown: self.score_breakdown.unwrap_or_default(),
            photo_url: self.photo_url,
            created_by,
            user_id: self.user_id,
        };
        Ok((candidate, skills))
    }
}

/// Body of `PUT/PATCH /api/candidates/:id`. Keys that are not sent stay `Absent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCandidatePayload {
    pub name: Patch<String>,
    pub email: Patch<String>,
    pub phone: Patch<Option<String>>,
    pub role: Patch<String>,
    pub status: Patch<String>,
    pub score: Patch<JsonValue>,
    pub experience: Patch<Vec<JsonValue>>,
    pub score_breakdown: Patch<BTreeMap<String, f64>>,
    pub photo_url: Patch<Option<String>>,
    #[serde(deserialize_with = "null_as_absent")]
    pub skills: Patch<Vec<String>>,
}

impl UpdateCandidatePayload {
    pub fn status(status: CandidateStatus) -> Self {
        Self {
            status: Patch::Set(status.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn into_patch(self) -> Result<CandidatePatch> {
        Ok(CandidatePatch {
            name: self.name.try_map(|v| non_blank("name", v))?,
            email: self.email.try_map(validate_email)?,
            phone: self.phone,
            role: self.role.try_map(|v| non_blank("role", v))?,
            status: self.status.try_map(|v| v.parse::<CandidateStatus>())?,
            score: self.score.try_map(|v| parse_score(&v))?,
            experience: self.experience,
            score_breakdown: self.score_breakdown,
            photo_url: self.photo_url,
            skills: self.skills.try_map(normalize_skills)?,
        })
    }
}

/// Body of `PUT /api/candidate-profile`: the subset a candidate may edit on their own record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdatePayload {
    pub name: Patch<String>,
    pub phone: Patch<Option<String>>,
    #[serde(deserialize_with = "null_as_absent")]
    pub skills: Patch<Vec<String>>,
}

impl From<ProfileUpdatePayload> for UpdateCandidatePayload {
    fn from(payload: ProfileUpdatePayload) -> Self {
        Self {
            name: payload.name,
            phone: payload.phone,
            skills: payload.skills,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPayload {
    #[serde(alias = "candidateId", deserialize_with = "integer_or_numeric_string")]
    pub candidate_id: i64,
}

/// Older clients send ids as strings (`"42"`).
fn integer_or_numeric_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("candidate_id must be an integer, got {:?}", text))
        }),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCandidatesQuery {
    pub status: Option<String>,
}

impl ListCandidatesQuery {
    /// `None` and `all` both mean "no filter".
    pub fn status_filter(&self) -> Result<Option<CandidateStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteCandidateResponse {
    pub id: i64,
    pub message: String,
}

/// Accepts JSON numbers and numeric strings; anything else is a validation error.
pub fn parse_score(raw: &JsonValue) -> Result<f64> {
    let parsed = match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Validation(format!("score must be a finite number, got {}", raw)))
}

fn validate_email(value: String) -> Result<String> {
    let trimmed = value.trim().to_string();
    if !trimmed.validate_email() {
        return Err(Error::Validation(format!("'{}' is not a valid email", trimmed)));
    }
    Ok(trimmed)
}

fn normalize_skills(names: Vec<String>) -> Result<Vec<String>> {
    names
        .into_iter()
        .map(|name| non_blank("skill name", name))
        .collect()
}
