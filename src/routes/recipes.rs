use std::sync::Arc;

use chrono::Local;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, Response},
    Filter, Reply,
};

use super::{json_body, with_repository};
use crate::{
    form::{RecipeForm, RecipeQuery},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::{Id, RelationKind},
    services::{
        recipes, relations,
        shopping::{self, ShoppingList},
    },
    store::SharedRepository,
};

pub fn routes(repo: SharedRepository, secret: Arc<str>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_repository(repo.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(download_shopping_cart);

    let get = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_repository(repo.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(delete_recipe);

    let favorite = relation_routes("favorite", RelationKind::Favorite, repo.clone(), secret.clone());
    let shopping_cart = relation_routes("shopping_cart", RelationKind::ShoppingCart, repo, secret);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .boxed()
}

/// `POST` and `DELETE` on `recipes/{id}/{segment}/`.
fn relation_routes(
    segment: &'static str,
    kind: RelationKind,
    repo: SharedRepository,
    secret: Arc<str>,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());
    let kind = warp::any().map(move || kind);

    let add = path
        .clone()
        .and(warp::post())
        .and(kind.clone())
        .and(with_session(secret.clone()))
        .and(with_repository(repo.clone()))
        .and_then(add_relation);

    let remove = path
        .and(warp::delete())
        .and(kind)
        .and(with_session(secret))
        .and(with_repository(repo))
        .and_then(remove_relation);

    add.or(remove).unify().boxed()
}

async fn list_recipes(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let query = RecipeQuery::from_pairs(pairs).map_err(reject::custom)?;
    let viewer = session.map(|s| s.user_id);

    let page = recipes::list_recipes(repo.as_ref(), viewer, &query)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&page).into_response())
}

async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let recipe = recipes::create_recipe(repo.as_ref(), session.user_id, form)
        .await
        .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&recipe), StatusCode::CREATED).into_response())
}

async fn get_recipe(
    id: Id,
    session: Option<SessionData>,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let recipe = recipes::get_recipe(repo.as_ref(), viewer, id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&recipe).into_response())
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let recipe = recipes::update_recipe(repo.as_ref(), session.user_id, id, form)
        .await
        .map_err(reject::custom)?;

    Ok(reply::json(&recipe).into_response())
}

async fn delete_recipe(
    id: Id,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    recipes::delete_recipe(repo.as_ref(), session.user_id, id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn add_relation(
    id: Id,
    kind: RelationKind,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let summary = relations::add_relation(repo.as_ref(), kind, session.user_id, id)
        .await
        .map_err(reject::custom)?;

    Ok(reply::with_status(reply::json(&summary), StatusCode::CREATED).into_response())
}

async fn remove_relation(
    id: Id,
    kind: RelationKind,
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    relations::remove_relation(repo.as_ref(), kind, session.user_id, id)
        .await
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn download_shopping_cart(
    session: SessionData,
    repo: SharedRepository,
) -> Result<Response, Rejection> {
    let list = shopping::shopping_list(repo.as_ref(), session.user_id)
        .await
        .map_err(reject::custom)?;
    let file_name = ShoppingList::file_name(Local::now().date_naive());

    let response = reply::with_header(
        reply::with_header(list.to_string(), "content-type", "text/plain; charset=utf-8"),
        "content-disposition",
        format!("attachment; filename=\"{file_name}\""),
    );
    Ok(response.into_response())
}
