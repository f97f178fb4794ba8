use std::sync::Arc;

use async_trait::async_trait;

use super::{
    error::QueryError,
    schema::{
        CartItem, Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft,
        RecipeFilter, RecipeIngredient, RelationKind, Tag, User,
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a unique violation when the email or username is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<User, QueryError>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, QueryError>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, QueryError>;
    async fn count_users(&self) -> Result<i64, QueryError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn insert_tag(&self, tag: &NewTag) -> Result<Tag, QueryError>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, QueryError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, QueryError>;
    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, QueryError>;
}

#[async_trait]
pub trait IngredientStore: Send + Sync {
    async fn insert_ingredient(&self, ingredient: &NewIngredient)
        -> Result<Ingredient, QueryError>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, QueryError>;
    /// Ordered by name; `prefix` matches the start of the name case-insensitively.
    async fn list_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, QueryError>;
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Writes the recipe, its tags and its ingredient rows atomically.
    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft)
        -> Result<Recipe, QueryError>;
    /// Replaces fields, tags and ingredient rows atomically. A `None` image keeps the old one.
    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, QueryError>;
    /// Removes the recipe together with its ingredient, tag, favorite and cart rows.
    async fn delete_recipe(&self, id: Id) -> Result<bool, QueryError>;
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, QueryError>;
    async fn list_recipe_ingredients(&self, recipe_id: Id)
        -> Result<Vec<RecipeIngredient>, QueryError>;
    async fn find_recipes_by_name(&self, name: &str) -> Result<Vec<Id>, QueryError>;
    /// Newest first.
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, QueryError>;
    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, QueryError>;
    /// Newest first, at most `limit` when given.
    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, QueryError>;
    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, QueryError>;
}

#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Returns `false` when the row was already present.
    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError>;
    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError>;
    /// Every ingredient row of every recipe in the user's cart, unaggregated.
    async fn list_cart_items(&self, user_id: Id) -> Result<Vec<CartItem>, QueryError>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Fails with a unique violation for an existing pair and a check violation for self-follow.
    async fn insert_follow(&self, user_id: Id, author_id: Id) -> Result<(), QueryError>;
    async fn delete_follow(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError>;
    async fn follow_exists(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError>;
    /// Ordered by author id.
    async fn list_followed_authors(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, QueryError>;
    async fn count_followed_authors(&self, user_id: Id) -> Result<i64, QueryError>;
}

pub trait Repository:
    UserStore + TagStore + IngredientStore + RecipeStore + RelationStore + FollowStore
{
}

impl<T> Repository for T where
    T: UserStore + TagStore + IngredientStore + RecipeStore + RelationStore + FollowStore
{
}

pub type SharedRepository = Arc<dyn Repository>;
