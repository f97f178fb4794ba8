//! Wire projections. Every per-viewer field (`is_subscribed`, `is_favorited`,
//! `is_in_shopping_cart`) is computed here from an explicit viewer id.

use serde::Serialize;

use crate::{
    error::{ApiError, QueryError},
    schema::{Id, Recipe, RelationKind, Tag, User},
    store::Repository,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeSummary {
    pub id: Id,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author: profile plus their recipes.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthorView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

pub async fn is_subscribed(
    repo: &dyn Repository,
    viewer: Option<Id>,
    author_id: Id,
) -> Result<bool, QueryError> {
    match viewer {
        Some(viewer) if viewer != author_id => repo.follow_exists(viewer, author_id).await,
        _ => Ok(false),
    }
}

async fn has_relation(
    repo: &dyn Repository,
    kind: RelationKind,
    viewer: Option<Id>,
    recipe_id: Id,
) -> Result<bool, QueryError> {
    match viewer {
        Some(viewer) => repo.relation_exists(kind, viewer, recipe_id).await,
        None => Ok(false),
    }
}

pub async fn user_view(
    repo: &dyn Repository,
    user: User,
    viewer: Option<Id>,
) -> Result<UserView, QueryError> {
    let is_subscribed = is_subscribed(repo, viewer, user.id).await?;

    Ok(UserView {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    })
}

pub async fn author_view(
    repo: &dyn Repository,
    author: User,
    viewer: Option<Id>,
    recipes_limit: Option<i64>,
) -> Result<AuthorView, QueryError> {
    let is_subscribed = is_subscribed(repo, viewer, author.id).await?;
    let recipes = repo
        .list_author_recipes(author.id, recipes_limit)
        .await?
        .iter()
        .map(RecipeSummary::from)
        .collect();
    let recipes_count = repo.count_author_recipes(author.id).await?;

    Ok(AuthorView {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed,
        recipes,
        recipes_count,
    })
}

pub async fn recipe_view(
    repo: &dyn Repository,
    recipe: Recipe,
    viewer: Option<Id>,
) -> Result<RecipeView, ApiError> {
    let author = repo.get_user(recipe.author_id).await?.ok_or_else(|| {
        ApiError::Internal(format!("Recipe {} has no author row", recipe.id))
    })?;
    let author = user_view(repo, author, viewer).await?;

    let tags = repo.list_recipe_tags(recipe.id).await?;
    let ingredients = repo
        .list_recipe_ingredients(recipe.id)
        .await?
        .into_iter()
        .map(|part| RecipeIngredientView {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        })
        .collect();

    let is_favorited = has_relation(repo, RelationKind::Favorite, viewer, recipe.id).await?;
    let is_in_shopping_cart =
        has_relation(repo, RelationKind::ShoppingCart, viewer, recipe.id).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}
