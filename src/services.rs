//! Request-independent operations. Each takes the store and, where it matters,
//! the acting user explicitly.

pub mod catalog;
pub mod recipes;
pub mod relations;
pub mod shopping;
pub mod subscriptions;
pub mod users;

use crate::{
    error::ApiError,
    schema::{Id, Recipe, User},
    store::Repository,
};

pub(crate) async fn find_recipe(repo: &dyn Repository, id: Id) -> Result<Recipe, ApiError> {
    repo.get_recipe(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))
}

pub(crate) async fn find_user(repo: &dyn Repository, id: Id) -> Result<User, ApiError> {
    repo.get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}
