use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::error::ApiError;
use crate::schema::Id;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        (self.exp - now).is_negative()
    }
}

/// The identity of the caller, passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
        }
    }
}

fn session_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Internal("Invalid session signing key".to_owned()))
}

/// Signs session claims; tokens are normally minted by the identity service sharing `secret`.
pub fn generate_jwt_session(claims: &JwtSessionData, secret: &str) -> Result<String, ApiError> {
    let key = session_key(secret)?;

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = session_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::Unauthorized("Invalid session; Invalid token".to_owned()))?;

    if session.is_expired(Local::now().timestamp()) {
        return Err(ApiError::Unauthorized(
            "Invalid session; Token expired".to_owned(),
        ));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_session_verifies_with_same_secret() {
        let claims = JwtSessionData::new(7, "chef".to_owned());
        let token = generate_jwt_session(&claims, "secret").unwrap();

        let session = verify_jwt_session(&token, "secret").unwrap();

        assert_eq!(session, claims);
        assert_eq!(SessionData::from(session).user_id, 7);
    }

    #[test]
    fn other_secret_is_rejected() {
        let claims = JwtSessionData::new(7, "chef".to_owned());
        let token = generate_jwt_session(&claims, "secret").unwrap();

        let error = verify_jwt_session(&token, "another").unwrap_err();

        assert!(matches!(error, ApiError::Unauthorized(_)));
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut claims = JwtSessionData::new(7, "chef".to_owned());
        claims.exp = Local::now().timestamp() - 60;
        let token = generate_jwt_session(&claims, "secret").unwrap();

        let error = verify_jwt_session(&token, "secret").unwrap_err();

        assert_eq!(
            error,
            ApiError::Unauthorized("Invalid session; Token expired".to_owned())
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_jwt_session("not.a.token", "secret").is_err());
    }
}
