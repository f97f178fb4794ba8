//! The JSON API under `/api/`. Handlers unwrap the session into an explicit
//! actor or viewer id and delegate to [`crate::services`].

mod catalog;
mod recipes;
mod users;

use std::{convert::Infallible, sync::Arc};

use log::error;
use warp::{
    body::BodyDeserializeError,
    filters::BoxedFilter,
    reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, Rejection, UnsupportedMediaType},
    reply::Response,
    Filter, Reply,
};

use crate::{error::ApiError, store::SharedRepository};

const MAX_BODY_BYTES: u64 = 64 * 1024;

fn with_repository(
    repo: SharedRepository,
) -> impl Filter<Extract = (SharedRepository,), Error = Infallible> + Clone {
    warp::any().map(move || repo.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn api(
    repo: SharedRepository,
    secret: Arc<str>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let routes: BoxedFilter<(Response,)> = users::routes(repo.clone(), secret.clone())
        .or(catalog::routes(repo.clone(), secret.clone()))
        .unify()
        .or(recipes::routes(repo, secret))
        .unify()
        .boxed();

    warp::path("api")
        .and(routes)
        .recover(recover)
        .with(warp::log("foodgram::api"))
}

/// Renders every rejection as a JSON error body.
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let error = if let Some(error) = rejection.find::<ApiError>() {
        error.clone()
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        ApiError::validation("non_field_errors", e.to_string())
    } else if rejection.find::<InvalidQuery>().is_some() {
        ApiError::validation("non_field_errors", "Invalid query string.")
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        ApiError::validation("non_field_errors", "Request body is too large.")
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        ApiError::validation("non_field_errors", "Expected a JSON body.")
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        ApiError::MethodNotAllowed
    } else if rejection.is_not_found() {
        ApiError::NotFound("Not found.".to_owned())
    } else {
        ApiError::Internal(format!("Unhandled rejection: {rejection:?}"))
    };

    if let ApiError::Internal(cause) = &error {
        error!("{cause}");
    }
    Ok(error.into_response())
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use warp::http::StatusCode;

    use super::{testing::*, *};

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let (_, repo, secret) = setup();
        let api = api(repo, secret);

        let response = warp::test::request()
            .path("/api/nothing/here/")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(&response), json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn wrong_method_is_reported() {
        let (_, repo, secret) = setup();
        let api = api(repo, secret);

        let response = warp::test::request()
            .method("PUT")
            .path("/api/tags/")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (_, repo, secret) = setup();
        let api = api(repo, secret);

        let response = warp::test::request()
            .method("POST")
            .path("/api/users/")
            .header("content-type", "application/json")
            .body("{\"email\":")
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json(&response).get("non_field_errors").is_some());
    }
}
