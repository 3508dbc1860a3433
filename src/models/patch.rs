//! Sparse update types.
//!
//! A JSON body distinguishes a field that was left out from one that was sent
//! with an empty or `null` value, and a partial update has to keep that
//! distinction all the way down to the SQL it generates. [`Patch`] is the
//! explicit "absent vs set" wrapper; nullable columns use `Patch<Option<T>>`,
//! so `{"phone": null}` clears the phone while `{}` leaves it untouched.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::models::candidate::{Candidate, CandidateStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Patch<U>, E> {
        match self {
            Patch::Set(value) => f(value).map(Patch::Set),
            Patch::Absent => Ok(Patch::Absent),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Absent, Patch::Set)
    }
}

// Only called when the key is present; missing keys fall back to `Default`.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

/// `deserialize_with` helper for collection fields where `null` means "not supplied".
pub fn null_as_absent<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Patch::from)
}

/// Validated partial update for one candidate. Built from the request DTOs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePatch {
    pub name: Patch<String>,
    pub email: Patch<String>,
    pub phone: Patch<Option<String>>,
    pub role: Patch<String>,
    pub status: Patch<CandidateStatus>,
    pub score: Patch<f64>,
    pub experience: Patch<Vec<JsonValue>>,
    pub score_breakdown: Patch<BTreeMap<String, f64>>,
    pub photo_url: Patch<Option<String>>,
    pub skills: Patch<Vec<String>>,
}

impl CandidatePatch {
    /// True when applying the row-level fields would change `current`.
    /// Skills are not part of the candidate row and are ignored here.
    pub fn differs_from(&self, current: &Candidate) -> bool {
        fn changed<T: PartialEq>(field: &Patch<T>, current: &T) -> bool {
            field.as_set().map_or(false, |value| value != current)
        }

        changed(&self.name, &current.name)
            || changed(&self.email, &current.email)
            || changed(&self.phone, &current.phone)
            || changed(&self.role, &current.role)
            || changed(&self.status, &current.status)
            || changed(&self.score, &current.score)
            || changed(&self.experience, &current.experience.0)
            || changed(&self.score_breakdown, &current.score_breakdown.0)
            || changed(&self.photo_url, &current.photo_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct PatchFields {
        phone: Patch<Option<String>>,
        score: Patch<f64>,
        #[serde(deserialize_with = "null_as_absent")]
        skills: Patch<Vec<String>>,
    }

    #[test]
    fn missing_null_and_empty_are_distinct() {
        let missing: PatchFields = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.phone, Patch::Absent);
        assert_eq!(missing.score, Patch::Absent);
        assert_eq!(missing.skills, Patch::Absent);

        let null_phone: PatchFields = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(null_phone.phone, Patch::Set(None));

        let empty: PatchFields =
            serde_json::from_str(r#"{"phone": "", "score": 0, "skills": []}"#).unwrap();
        assert_eq!(empty.phone, Patch::Set(Some(String::new())));
        assert_eq!(empty.score, Patch::Set(0.0));
        assert_eq!(empty.skills, Patch::Set(vec![]));
    }

    #[test]
    fn null_skills_are_treated_as_not_supplied() {
        let fields: PatchFields = serde_json::from_str(r#"{"skills": null}"#).unwrap();
        assert_eq!(fields.skills, Patch::Absent);
    }
}
