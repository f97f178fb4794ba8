use std::sync::Arc;

use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, Response},
    Filter, Reply,
};

use super::{json_body, with_repository};
use crate::{
    form::{SubscriptionQuery, UserForm},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageQuery,
    schema::Id,
    services::{subscriptions, users},
    store::SharedRepository,
};

pub fn routes(repo: SharedRepository, secret: Arc<str>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(with_possible_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body::<UserForm>())
        .and(with_repository(repo.clone()))
        .and_then(register_user);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(me);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(list_subscriptions);

    let profile = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(get_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_repository(repo))
        .and_then(unsubscribe);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(profile)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

async fn list_users(
    page: PageQuery,
    session: Option<SessionData>,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let page = users::list_users(repo.as_ref(), viewer, page)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&page).into_response())
}

async fn register_user(form: UserForm, repo: SharedRepository) -> Result<Response, Rejection> {
    let user = users::register_user(repo.as_ref(), form)
        .await
        .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&user), StatusCode::CREATED).into_response())
}

async fn me(session: SessionData, repo: SharedRepository) -> Result<Response, Rejection> {
    let user = users::me(repo.as_ref(), session.user_id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&user).into_response())
}

async fn get_user(
    id: Id,
    session: Option<SessionData>,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let user = users::get_user(repo.as_ref(), viewer, id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&user).into_response())
}

async fn list_subscriptions(
    query: SubscriptionQuery,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let page = subscriptions::subscriptions(
        repo.as_ref(),
        session.user_id,
        query.page(),
        query.recipes_limit,
    )
    .await
    .map_err(reject::custom)?;

    Ok(reply::json(&page).into_response())
}

async fn subscribe(
    author_id: Id,
    query: SubscriptionQuery,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let author = subscriptions::subscribe(
        repo.as_ref(),
        session.user_id,
        author_id,
        query.recipes_limit,
    )
    .await
    .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&author), StatusCode::CREATED).into_response())
}

async fn unsubscribe(
    author_id: Id,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    subscriptions::unsubscribe(repo.as_ref(), session.user_id, author_id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use warp::http::StatusCode;

    use crate::{
        memory::seed,
        routes::{api, testing::*},
        store::FollowStore,
    };

    #[tokio::test]
    async fn registration_creates_a_profile() {
        let (_, repo, secret) = setup();
        let api = api(repo, secret);

        let response = warp::test::request()
            .method("POST")
            .path("/api/users/")
            .json(&json!({
                "email": "ann@foodgram.test",
                "username": "ann",
                "first_name": "Ann",
                "last_name": "Baker",
            }))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(&response);
        assert_eq!(body["username"], "ann");
        assert_eq!(body["is_subscribed"], false);
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let (repo, shared, secret) = setup();
        let cook = seed::user(&repo, "cook").await;
        let api = api(shared, secret);

        let anonymous = warp::test::request()
            .path("/api/users/me/")
            .reply(&api)
            .await;
        let signed_in = warp::test::request()
            .path("/api/users/me/")
            .header("authorization", token(&cook))
            .reply(&api)
            .await;

        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(signed_in.status(), StatusCode::OK);
        assert_eq!(json(&signed_in)["id"], cook.id);
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe() {
        let (repo, shared, secret) = setup();
        let fan = seed::user(&repo, "fan").await;
        let cook = seed::user(&repo, "cook").await;
        let api = api(shared, secret);
        let path = format!("/api/users/{}/subscribe/?recipes_limit=1", cook.id);

        let created = warp::test::request()
            .method("POST")
            .path(&path)
            .header("authorization", token(&fan))
            .reply(&api)
            .await;
        let duplicate = warp::test::request()
            .method("POST")
            .path(&path)
            .header("authorization", token(&fan))
            .reply(&api)
            .await;

        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(&created)["is_subscribed"], true);
        assert_eq!(json(&created)["recipes_count"], 0);
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let listed = warp::test::request()
            .path("/api/users/subscriptions/")
            .header("authorization", token(&fan))
            .reply(&api)
            .await;
        assert_eq!(json(&listed)["count"], 1);
        assert_eq!(json(&listed)["results"][0]["id"], cook.id);

        let deleted = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/users/{}/subscribe/", cook.id))
            .header("authorization", token(&fan))
            .reply(&api)
            .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert!(!repo.follow_exists(fan.id, cook.id).await.unwrap());
    }

    #[tokio::test]
    async fn self_subscribe_is_a_bad_request() {
        let (repo, shared, secret) = setup();
        let cook = seed::user(&repo, "cook").await;
        let api = api(shared, secret);

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/api/users/{}/subscribe/", cook.id))
            .header("authorization", token(&cook))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json(&response)["non_field_errors"].is_array());
    }

    #[tokio::test]
    async fn profiles_show_subscription_state() {
        let (repo, shared, secret) = setup();
        let fan = seed::user(&repo, "fan").await;
        let cook = seed::user(&repo, "cook").await;
        repo.insert_follow(fan.id, cook.id).await.unwrap();
        let api = api(shared, secret);
        let path = format!("/api/users/{}/", cook.id);

        let as_fan = warp::test::request()
            .path(&path)
            .header("authorization", token(&fan))
            .reply(&api)
            .await;
        let as_guest = warp::test::request().path(&path).reply(&api).await;
        let listed = warp::test::request()
            .path("/api/users/?limit=1")
            .reply(&api)
            .await;

        assert_eq!(json(&as_fan)["is_subscribed"], true);
        assert_eq!(json(&as_guest)["is_subscribed"], false);
        assert_eq!(json(&listed)["count"], 2);
        assert_eq!(json(&listed)["next"], 2);
        assert_eq!(json(&listed)["previous"], serde_json::Value::Null);
    }
}
