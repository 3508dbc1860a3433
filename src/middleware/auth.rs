use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::AppState;

pub const STAFF_ROLES: &[&str] = &["admin", "hr", "recruiter"];
pub const CANDIDATE_ROLES: &[&str] = &["candidate"];

/// Principal issued by the identity service. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| Error::Unauthorized("Token subject is not a user id".to_string()))
    }
}

pub async fn require_staff(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(req, next, &state.config.jwt_secret, STAFF_ROLES).await
}

pub async fn require_candidate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(req, next, &state.config.jwt_secret, CANDIDATE_ROLES).await
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn bearer_token(req: &Request) -> std::result::Result<&str, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"))
}

async fn require_roles(mut req: Request, next: Next, secret: &str, allowed: &[&str]) -> Response {
    let claims = {
        let token = match bearer_token(&req) {
            Ok(token) => token,
            Err(response) => return response,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!(error = %err, "Rejected bearer token");
                return reject(StatusCode::UNAUTHORIZED, "invalid_token");
            }
        }
    };

    let role = claims.role.clone().unwrap_or_default();
    if !allowed.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}
