use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use log::warn;
use serde::Serialize;
use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::{self, Response},
    Reply,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    UniqueViolation,
    CheckViolation,
    ForeignKeyViolation,
    RowNotFound,
    Other,
}

#[derive(Debug, Clone)]
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: QueryErrorKind::Other,
            info,
        }
    }

    pub fn with_kind(kind: QueryErrorKind, info: impl Into<String>) -> Self {
        Self {
            kind,
            info: info.into(),
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == QueryErrorKind::UniqueViolation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let kind = if e.is_unique_violation() {
                    QueryErrorKind::UniqueViolation
                } else if e.is_check_violation() {
                    QueryErrorKind::CheckViolation
                } else if e.is_foreign_key_violation() {
                    QueryErrorKind::ForeignKeyViolation
                } else {
                    QueryErrorKind::Other
                };
                Self::with_kind(kind, format!("{e}"))
            }
            sqlx::Error::RowNotFound => Self::with_kind(QueryErrorKind::RowNotFound, "RowNotFound"),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_owned()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_owned()),
            other => Self::new(format!("{other}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.info)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Field name to messages, serialized the way clients expect validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ApiError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound(String),
    Validation(FieldErrors),
    Conflict(String),
    Forbidden(String),
    Unauthorized(String),
    MethodNotAllowed,
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found."))
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::MethodNotAllowed => json!({ "detail": "Method not allowed." }),
            // The cause is logged, never sent to the client.
            ApiError::Internal(_) => json!({ "detail": "Internal server error." }),
            ApiError::NotFound(detail)
            | ApiError::Conflict(detail)
            | ApiError::Forbidden(detail)
            | ApiError::Unauthorized(detail) => json!({ "detail": detail }),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::UniqueViolation => {
                ApiError::Conflict("Object with these fields already exists.".to_owned())
            }
            QueryErrorKind::CheckViolation => {
                warn!("Check violation: {}", value.info);
                ApiError::validation("non_field_errors", "Invalid value for this object.")
            }
            QueryErrorKind::ForeignKeyViolation => {
                warn!("Foreign key violation: {}", value.info);
                ApiError::validation("non_field_errors", "Referenced object does not exist.")
            }
            QueryErrorKind::RowNotFound | QueryErrorKind::Other => ApiError::Internal(value.info),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "Validation failed: {:?}", errors.0),
            ApiError::MethodNotAllowed => write!(f, "Method not allowed"),
            ApiError::NotFound(info)
            | ApiError::Conflict(info)
            | ApiError::Forbidden(info)
            | ApiError::Unauthorized(info)
            | ApiError::Internal(info) => write!(f, "{info}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        reply::with_status(reply::json(&self.body()), self.status()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_becomes_conflict() {
        let error: ApiError =
            QueryError::with_kind(QueryErrorKind::UniqueViolation, "duplicate key").into();

        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn check_violation_becomes_field_error() {
        let error: ApiError =
            QueryError::with_kind(QueryErrorKind::CheckViolation, "prevent_self_follow").into();

        match error {
            ApiError::Validation(errors) => assert_eq!(
                errors.messages("non_field_errors"),
                ["Invalid value for this object."]
            ),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn constraint_errors_hide_database_text() {
        let error: ApiError = QueryError::with_kind(
            QueryErrorKind::ForeignKeyViolation,
            "favorites references a missing row",
        )
        .into();

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error.body(),
            json!({ "non_field_errors": ["Referenced object does not exist."] })
        );
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let error = ApiError::Internal("connection reset".to_owned());

        assert_eq!(error.body(), json!({ "detail": "Internal server error." }));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("ingredients", "first");
        errors.add("ingredients", "second");
        errors.add("tags", "third");

        assert_eq!(
            json!(errors),
            json!({ "ingredients": ["first", "second"], "tags": ["third"] })
        );
        assert!(errors.into_result(()).is_err());
        assert_eq!(FieldErrors::new().into_result(5), Ok(5));
    }
}
