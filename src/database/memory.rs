//! A [`Repository`](super::store::Repository) held in memory, used by the test suite.
//! Unique keys, the self-follow check, foreign keys and cascades mirror `migrations/`.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{
    error::{QueryError, QueryErrorKind},
    schema::{
        CartItem, Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft,
        RecipeFilter, RecipeIngredient, RelationKind, Tag, TagChoice, User,
    },
    store::{FollowStore, IngredientStore, RecipeStore, RelationStore, TagStore, UserStore},
};

#[derive(Debug, Clone, Copy)]
struct PartRow {
    recipe_id: Id,
    ingredient_id: Id,
    amount: i32,
}

#[derive(Debug, Default)]
struct Tables {
    sequence: Id,
    users: Vec<User>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    recipe_ingredients: Vec<PartRow>,
    recipe_tags: BTreeSet<(Id, Id)>,
    favorites: BTreeSet<(Id, Id)>,
    wishlists: BTreeSet<(Id, Id)>,
    follows: BTreeSet<(Id, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.sequence += 1;
        self.sequence
    }

    fn relations(&mut self, kind: RelationKind) -> &mut BTreeSet<(Id, Id)> {
        match kind {
            RelationKind::Favorite => &mut self.favorites,
            RelationKind::ShoppingCart => &mut self.wishlists,
        }
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        let tagged = filter.tags.is_empty()
            || self.recipe_tags.iter().any(|(recipe_id, tag_id)| {
                *recipe_id == recipe.id
                    && self
                        .tags
                        .iter()
                        .any(|t| t.id == *tag_id && filter.tags.contains(&t.slug))
            });
        let by_author = filter.author.map_or(true, |author| recipe.author_id == author);
        let favorited = filter
            .favorited_by
            .map_or(true, |user| self.favorites.contains(&(user, recipe.id)));
        let in_cart = filter
            .in_cart_of
            .map_or(true, |user| self.wishlists.contains(&(user, recipe.id)));

        tagged && by_author && favorited && in_cart
    }

    fn check_references(&self, draft: &RecipeDraft) -> Result<(), QueryError> {
        let tags_exist = draft
            .tags
            .iter()
            .all(|id| self.tags.iter().any(|t| t.id == *id));
        let ingredients_exist = draft
            .ingredients
            .iter()
            .all(|part| self.ingredients.iter().any(|i| i.id == part.ingredient_id));

        if tags_exist && ingredients_exist {
            Ok(())
        } else {
            Err(QueryError::with_kind(
                QueryErrorKind::ForeignKeyViolation,
                "recipe references a missing row",
            ))
        }
    }

    fn replace_parts(&mut self, recipe_id: Id, draft: &RecipeDraft) {
        self.recipe_tags.retain(|(id, _)| *id != recipe_id);
        self.recipe_ingredients.retain(|row| row.recipe_id != recipe_id);

        for tag_id in &draft.tags {
            self.recipe_tags.insert((recipe_id, *tag_id));
        }
        for part in &draft.ingredients {
            self.recipe_ingredients.push(PartRow {
                recipe_id,
                ingredient_id: part.ingredient_id,
                amount: part.amount,
            });
        }
    }
}

fn unique_violation(constraint: &str) -> QueryError {
    QueryError::with_kind(
        QueryErrorKind::UniqueViolation,
        format!("duplicate key value violates unique constraint \"{constraint}\""),
    )
}

fn newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[derive(Debug)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    relation_race: AtomicBool,
}

impl MemoryRepository {
    /// An empty store holding the three seeded tags, like a freshly migrated database.
    pub fn new() -> Self {
        let repository = Self {
            tables: Mutex::new(Tables::default()),
            relation_race: AtomicBool::new(false),
        };

        {
            let mut tables = repository.tables();
            for (name, color) in [
                (TagChoice::Breakfast, "#E26C2D"),
                (TagChoice::Lunch, "#49B64E"),
                (TagChoice::Dinner, "#8775D2"),
            ] {
                let id = tables.next_id();
                tables.tags.push(Tag {
                    id,
                    name,
                    color: color.to_owned(),
                    slug: name.as_str().to_owned(),
                });
            }
        }

        repository
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Makes the next relation insert behave as if a concurrent request inserted
    /// the same row first: the row lands and the insert reports a unique violation.
    pub fn race_next_relation_insert(&self) {
        self.relation_race.store(true, Ordering::SeqCst);
    }

    pub fn delete_ingredient(&self, id: Id) {
        let mut tables = self.tables();
        tables.ingredients.retain(|i| i.id != id);
        tables.recipe_ingredients.retain(|row| row.ingredient_id != id);
    }

    pub fn delete_user(&self, id: Id) {
        let mut tables = self.tables();
        let recipes: Vec<Id> = tables
            .recipes
            .iter()
            .filter(|r| r.author_id == id)
            .map(|r| r.id)
            .collect();

        tables.users.retain(|u| u.id != id);
        tables.recipes.retain(|r| r.author_id != id);
        tables
            .recipe_ingredients
            .retain(|row| !recipes.contains(&row.recipe_id));
        tables.recipe_tags.retain(|(r, _)| !recipes.contains(r));
        tables
            .favorites
            .retain(|(u, r)| *u != id && !recipes.contains(r));
        tables
            .wishlists
            .retain(|(u, r)| *u != id && !recipes.contains(r));
        tables.follows.retain(|(u, a)| *u != id && *a != id);
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<User, QueryError> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(unique_violation("users_email_key"));
        }
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(unique_violation("users_username_key"));
        }

        let row = User {
            id: tables.next_id(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, QueryError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, QueryError> {
        let mut rows = self.tables().users.clone();
        rows.sort_by_key(|u| u.id);
        Ok(page(rows, limit, offset))
    }

    async fn count_users(&self) -> Result<i64, QueryError> {
        Ok(self.tables().users.len() as i64)
    }
}

#[async_trait]
impl TagStore for MemoryRepository {
    async fn insert_tag(&self, tag: &NewTag) -> Result<Tag, QueryError> {
        let mut tables = self.tables();
        if tables.tags.iter().any(|t| t.color == tag.color) {
            return Err(unique_violation("tags_color_key"));
        }
        if tables.tags.iter().any(|t| t.slug == tag.slug) {
            return Err(unique_violation("tags_slug_key"));
        }

        let row = Tag {
            id: tables.next_id(),
            name: tag.name,
            color: tag.color.clone(),
            slug: tag.slug.clone(),
        };
        tables.tags.push(row.clone());
        Ok(row)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, QueryError> {
        Ok(self.tables().tags.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, QueryError> {
        let mut rows = self.tables().tags.clone();
        rows.sort_by_key(|t| t.id);
        Ok(rows)
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, QueryError> {
        let tables = self.tables();
        let mut rows: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|t| tables.recipe_tags.contains(&(recipe_id, t.id)))
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.id);
        Ok(rows)
    }
}

#[async_trait]
impl IngredientStore for MemoryRepository {
    async fn insert_ingredient(
        &self,
        ingredient: &NewIngredient,
    ) -> Result<Ingredient, QueryError> {
        let mut tables = self.tables();
        let taken = tables.ingredients.iter().any(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        });
        if taken {
            return Err(unique_violation("uq_ingredient_name_unit"));
        }

        let row = Ingredient {
            id: tables.next_id(),
            name: ingredient.name.clone(),
            measurement_unit: ingredient.measurement_unit.clone(),
        };
        tables.ingredients.push(row.clone());
        Ok(row)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, QueryError> {
        Ok(self.tables().ingredients.iter().find(|i| i.id == id).cloned())
    }

    async fn list_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, QueryError> {
        let prefix = prefix.map(str::to_lowercase);
        let mut rows: Vec<Ingredient> = self
            .tables()
            .ingredients
            .iter()
            .filter(|i| {
                prefix
                    .as_ref()
                    .map_or(true, |p| i.name.to_lowercase().starts_with(p.as_str()))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}

#[async_trait]
impl RecipeStore for MemoryRepository {
    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tables = self.tables();
        if !tables.users.iter().any(|u| u.id == author_id) {
            return Err(QueryError::with_kind(
                QueryErrorKind::ForeignKeyViolation,
                "recipes_author_id_fkey",
            ));
        }
        tables.check_references(draft)?;

        let id = tables.next_id();
        let recipe = Recipe {
            id,
            author_id,
            name: draft.name.clone(),
            text: draft.text.clone(),
            cooking_time: draft.cooking_time,
            image: draft.image.clone(),
            created: Utc::now() + Duration::milliseconds(i64::from(id)),
        };
        tables.recipes.push(recipe.clone());
        tables.replace_parts(id, draft);
        Ok(recipe)
    }

    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tables = self.tables();
        tables.check_references(draft)?;

        let recipe = tables
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| QueryError::with_kind(QueryErrorKind::RowNotFound, "RowNotFound"))?;
        recipe.name = draft.name.clone();
        recipe.text = draft.text.clone();
        recipe.cooking_time = draft.cooking_time;
        if draft.image.is_some() {
            recipe.image = draft.image.clone();
        }
        let recipe = recipe.clone();

        tables.replace_parts(id, draft);
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, QueryError> {
        let mut tables = self.tables();
        let before = tables.recipes.len();
        tables.recipes.retain(|r| r.id != id);
        if tables.recipes.len() == before {
            return Ok(false);
        }

        tables.recipe_ingredients.retain(|row| row.recipe_id != id);
        tables.recipe_tags.retain(|(r, _)| *r != id);
        tables.favorites.retain(|(_, r)| *r != id);
        tables.wishlists.retain(|(_, r)| *r != id);
        Ok(true)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, QueryError> {
        Ok(self.tables().recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<RecipeIngredient>, QueryError> {
        let tables = self.tables();
        let mut rows: Vec<RecipeIngredient> = tables
            .recipe_ingredients
            .iter()
            .filter(|row| row.recipe_id == recipe_id)
            .filter_map(|row| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == row.ingredient_id)
                    .map(|i| RecipeIngredient {
                        recipe_id,
                        ingredient_id: i.id,
                        name: i.name.clone(),
                        measurement_unit: i.measurement_unit.clone(),
                        amount: row.amount,
                    })
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.ingredient_id.cmp(&b.ingredient_id)));
        Ok(rows)
    }

    async fn find_recipes_by_name(&self, name: &str) -> Result<Vec<Id>, QueryError> {
        Ok(self
            .tables()
            .recipes
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.id)
            .collect())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, QueryError> {
        let tables = self.tables();
        let mut rows: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|r| tables.matches(r, filter))
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(page(rows, limit, offset))
    }

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, QueryError> {
        let tables = self.tables();
        Ok(tables
            .recipes
            .iter()
            .filter(|r| tables.matches(r, filter))
            .count() as i64)
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, QueryError> {
        let mut rows: Vec<Recipe> = self
            .tables()
            .recipes
            .iter()
            .filter(|r| r.author_id == author_id)
            .cloned()
            .collect();
        newest_first(&mut rows);
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, QueryError> {
        Ok(self
            .tables()
            .recipes
            .iter()
            .filter(|r| r.author_id == author_id)
            .count() as i64)
    }
}

#[async_trait]
impl RelationStore for MemoryRepository {
    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        let mut tables = self.tables();
        let user_exists = tables.users.iter().any(|u| u.id == user_id);
        let recipe_exists = tables.recipes.iter().any(|r| r.id == recipe_id);
        if !user_exists || !recipe_exists {
            return Err(QueryError::with_kind(
                QueryErrorKind::ForeignKeyViolation,
                format!("{} references a missing row", kind.table()),
            ));
        }

        let inserted = tables.relations(kind).insert((user_id, recipe_id));
        if self.relation_race.swap(false, Ordering::SeqCst) {
            return Err(unique_violation(kind.table()));
        }
        Ok(inserted)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        Ok(self.tables().relations(kind).remove(&(user_id, recipe_id)))
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        Ok(self.tables().relations(kind).contains(&(user_id, recipe_id)))
    }

    async fn list_cart_items(&self, user_id: Id) -> Result<Vec<CartItem>, QueryError> {
        let guard = self.tables();
        let tables = &*guard;
        let items = tables
            .wishlists
            .iter()
            .filter(|(u, _)| *u == user_id)
            .flat_map(|(_, recipe_id)| {
                tables
                    .recipe_ingredients
                    .iter()
                    .filter(move |row| row.recipe_id == *recipe_id)
            })
            .filter_map(|row| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == row.ingredient_id)
                    .map(|i| CartItem {
                        name: i.name.clone(),
                        measurement_unit: i.measurement_unit.clone(),
                        amount: row.amount,
                    })
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl FollowStore for MemoryRepository {
    async fn insert_follow(&self, user_id: Id, author_id: Id) -> Result<(), QueryError> {
        if user_id == author_id {
            return Err(QueryError::with_kind(
                QueryErrorKind::CheckViolation,
                "new row for relation \"follows\" violates check constraint \"prevent_self_follow\"",
            ));
        }

        let mut tables = self.tables();
        if !tables.follows.insert((user_id, author_id)) {
            return Err(unique_violation("uq_user_author"));
        }
        Ok(())
    }

    async fn delete_follow(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError> {
        Ok(self.tables().follows.remove(&(user_id, author_id)))
    }

    async fn follow_exists(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError> {
        Ok(self.tables().follows.contains(&(user_id, author_id)))
    }

    async fn list_followed_authors(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, QueryError> {
        let tables = self.tables();
        let mut rows: Vec<User> = tables
            .users
            .iter()
            .filter(|u| tables.follows.contains(&(user_id, u.id)))
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.id);
        Ok(page(rows, limit, offset))
    }

    async fn count_followed_authors(&self, user_id: Id) -> Result<i64, QueryError> {
        Ok(self
            .tables()
            .follows
            .iter()
            .filter(|(u, _)| *u == user_id)
            .count() as i64)
    }
}

/// Seeding helpers shared by the service and route tests.
pub mod seed {
    use super::MemoryRepository;
    use crate::{
        schema::{Id, Ingredient, IngredientAmount, NewIngredient, NewUser, Recipe, RecipeDraft, User},
        store::{IngredientStore, RecipeStore, UserStore},
    };

    pub async fn user(repo: &MemoryRepository, username: &str) -> User {
        repo.insert_user(&NewUser {
            email: format!("{username}@foodgram.test"),
            username: username.to_owned(),
            first_name: username.to_owned(),
            last_name: "Cook".to_owned(),
        })
        .await
        .unwrap()
    }

    pub async fn ingredient(repo: &MemoryRepository, name: &str, unit: &str) -> Ingredient {
        repo.insert_ingredient(&NewIngredient {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        })
        .await
        .unwrap()
    }

    pub fn draft(name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> RecipeDraft {
        RecipeDraft {
            name: name.to_owned(),
            text: format!("How to make {name}."),
            cooking_time: 15,
            image: None,
            tags: tags.to_vec(),
            ingredients: ingredients
                .iter()
                .map(|(ingredient_id, amount)| IngredientAmount {
                    ingredient_id: *ingredient_id,
                    amount: *amount,
                })
                .collect(),
        }
    }

    pub async fn recipe(
        repo: &MemoryRepository,
        author: Id,
        name: &str,
        ingredients: &[(Id, i32)],
    ) -> Recipe {
        repo.insert_recipe(author, &draft(name, &[1], ingredients))
            .await
            .unwrap()
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_a_recipe_cascades() {
        let repo = MemoryRepository::new();
        let cook = seed::user(&repo, "cook").await;
        let flour = seed::ingredient(&repo, "flour", "g").await;
        let recipe = seed::recipe(&repo, cook.id, "Bread", &[(flour.id, 500)]).await;
        repo.insert_relation(RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap();
        repo.insert_relation(RelationKind::ShoppingCart, cook.id, recipe.id)
            .await
            .unwrap();

        assert!(repo.delete_recipe(recipe.id).await.unwrap());

        assert!(repo.list_cart_items(cook.id).await.unwrap().is_empty());
        assert!(!repo
            .relation_exists(RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap());
        assert!(repo.list_recipe_tags(recipe.id).await.unwrap().is_empty());
        assert!(!repo.delete_recipe(recipe.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_an_ingredient_cascades_to_recipes() {
        let repo = MemoryRepository::new();
        let cook = seed::user(&repo, "cook").await;
        let flour = seed::ingredient(&repo, "flour", "g").await;
        let salt = seed::ingredient(&repo, "salt", "g").await;
        let recipe =
            seed::recipe(&repo, cook.id, "Bread", &[(flour.id, 500), (salt.id, 5)]).await;

        repo.delete_ingredient(salt.id);

        let parts = repo.list_recipe_ingredients(recipe.id).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].ingredient_id, flour.id);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_follows_and_recipes() {
        let repo = MemoryRepository::new();
        let cook = seed::user(&repo, "cook").await;
        let fan = seed::user(&repo, "fan").await;
        let flour = seed::ingredient(&repo, "flour", "g").await;
        seed::recipe(&repo, cook.id, "Bread", &[(flour.id, 500)]).await;
        repo.insert_follow(fan.id, cook.id).await.unwrap();

        repo.delete_user(cook.id);

        assert_eq!(repo.count_followed_authors(fan.id).await.unwrap(), 0);
        assert_eq!(repo.count_recipes(&RecipeFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn constraints_are_enforced() {
        let repo = MemoryRepository::new();
        let cook = seed::user(&repo, "cook").await;

        let self_follow = repo.insert_follow(cook.id, cook.id).await.unwrap_err();
        assert_eq!(self_follow.kind(), QueryErrorKind::CheckViolation);

        let missing_recipe = repo
            .insert_relation(RelationKind::Favorite, cook.id, 999)
            .await
            .unwrap_err();
        assert_eq!(missing_recipe.kind(), QueryErrorKind::ForeignKeyViolation);

        seed::ingredient(&repo, "salt", "g").await;
        let duplicate = repo
            .insert_ingredient(&NewIngredient {
                name: "salt".to_owned(),
                measurement_unit: "g".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(duplicate.is_unique_violation());
    }
}
