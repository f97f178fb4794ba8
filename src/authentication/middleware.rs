use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{verify_jwt_session, SessionData};
use crate::error::ApiError;

/// Accepts `Token <jwt>` as well as `Bearer <jwt>`.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = header.as_deref().and_then(bearer_token).ok_or_else(|| {
                reject::custom(ApiError::Unauthorized(
                    "Authentication credentials were not provided.".to_owned(),
                ))
            })?;

            verify_jwt_session(token, &secret)
                .map(SessionData::from)
                .map_err(reject::custom)
        }
    })
}

/// Anonymous when the header is missing or the token does not verify.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        header
            .as_deref()
            .and_then(bearer_token)
            .and_then(|token| verify_jwt_session(token, &secret).ok())
            .map(SessionData::from)
    })
}
