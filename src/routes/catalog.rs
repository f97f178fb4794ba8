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
    form::{IngredientForm, IngredientQuery, TagForm},
    jwt::SessionData,
    middleware::with_session,
    schema::Id,
    services::catalog,
    store::SharedRepository,
};

pub fn routes(repo: SharedRepository, secret: Arc<str>) -> BoxedFilter<(Response,)> {
    let list_tags = warp::path!("tags")
        .and(warp::get())
        .and(with_repository(repo.clone()))
        .and_then(list_tags);

    let create_tag = warp::path!("tags")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<TagForm>())
        .and(with_repository(repo.clone()))
        .and_then(create_tag);

    let get_tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_repository(repo.clone()))
        .and_then(get_tag);

    let list_ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_repository(repo.clone()))
        .and_then(list_ingredients);

    let create_ingredient = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(secret))
        .and(json_body::<IngredientForm>())
        .and(with_repository(repo.clone()))
        .and_then(create_ingredient);

    let get_ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_repository(repo))
        .and_then(get_ingredient);

    list_tags
        .or(create_tag)
        .unify()
        .or(get_tag)
        .unify()
        .or(list_ingredients)
        .unify()
        .or(create_ingredient)
        .unify()
        .or(get_ingredient)
        .unify()
        .boxed()
}

async fn list_tags(repo: SharedRepository) -> Result<Response, Rejection> {
    let tags = catalog::list_tags(repo.as_ref())
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&tags).into_response())
}

async fn create_tag(
    _session: SessionData,
    form: TagForm,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let tag = catalog::create_tag(repo.as_ref(), form)
        .await
        .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&tag), StatusCode::CREATED).into_response())
}

async fn get_tag(id: Id, repo: SharedRepository) -> Result<Response, Rejection> {
    let tag = catalog::get_tag(repo.as_ref(), id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&tag).into_response())
}

async fn list_ingredients(
    query: IngredientQuery,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let ingredients = catalog::list_ingredients(repo.as_ref(), query.name.as_deref())
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&ingredients).into_response())
}

async fn create_ingredient(
    _session: SessionData,
    form: IngredientForm,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let ingredient = catalog::create_ingredient(repo.as_ref(), form)
        .await
        .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&ingredient), StatusCode::CREATED).into_response())
}

async fn get_ingredient(id: Id, repo: SharedRepository) -> Result<Response, Rejection> {
    let ingredient = catalog::get_ingredient(repo.as_ref(), id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&ingredient).into_response())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use warp::http::StatusCode;

    use crate::{
        memory::seed,
        routes::{api, testing::*},
    };

    #[tokio::test]
    async fn tags_are_public() {
        let (_, repo, secret) = setup();
        let api = api(repo, secret);

        let list = warp::test::request().path("/api/tags/").reply(&api).await;
        let one = warp::test::request().path("/api/tags/2/").reply(&api).await;
        let missing = warp::test::request().path("/api/tags/99/").reply(&api).await;

        assert_eq!(list.status(), StatusCode::OK);
        assert_eq!(json(&list).as_array().map(Vec::len), Some(3));
        assert_eq!(
            json(&one),
            json!({ "id": 2, "name": "lunch", "color": "#49B64E", "slug": "lunch" })
        );
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(&missing), json!({ "detail": "Tag not found." }));
    }

    #[tokio::test]
    async fn creating_needs_a_session() {
        let (repo, shared, secret) = setup();
        let cook = seed::user(&repo, "cook").await;
        let api = api(shared, secret);
        let body = json!({ "name": "salt", "measurement_unit": "g" });

        let anonymous = warp::test::request()
            .method("POST")
            .path("/api/ingredients/")
            .json(&body)
            .reply(&api)
            .await;
        let created = warp::test::request()
            .method("POST")
            .path("/api/ingredients/")
            .header("authorization", token(&cook))
            .json(&body)
            .reply(&api)
            .await;
        let duplicate = warp::test::request()
            .method("POST")
            .path("/api/ingredients/")
            .header("authorization", token(&cook))
            .json(&body)
            .reply(&api)
            .await;

        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(&created)["measurement_unit"], "g");
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_tag_lists_field_errors() {
        let (repo, shared, secret) = setup();
        let cook = seed::user(&repo, "cook").await;
        let api = api(shared, secret);

        let response = warp::test::request()
            .method("POST")
            .path("/api/tags/")
            .header("authorization", token(&cook))
            .json(&json!({ "name": "brunch", "color": "#123456", "slug": "brunch" }))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json(&response)["name"].is_array());
    }

    #[tokio::test]
    async fn ingredients_are_searched_by_name() {
        let (repo, shared, secret) = setup();
        seed::ingredient(&repo, "sugar", "g").await;
        seed::ingredient(&repo, "salt", "g").await;
        let api = api(shared, secret);

        let response = warp::test::request()
            .path("/api/ingredients/?name=su")
            .reply(&api)
            .await;

        let body = json(&response);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["name"], "sugar");
    }
}
