use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};

use super::PgRepository;
use crate::{
    error::QueryError,
    schema::{Id, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient},
    store::RecipeStore,
};

fn push_recipe_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    builder.push(" WHERE TRUE");

    if !filter.tags.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        builder.push_bind(filter.tags.clone());
        builder.push("))");
    }
    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ");
        builder.push_bind(author);
    }
    if let Some(user_id) = filter.favorited_by {
        builder.push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        builder.push(" AND EXISTS (SELECT 1 FROM wishlists w WHERE w.recipe_id = r.id AND w.user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }
}

/// Replaces the tag and ingredient rows of a recipe inside the caller's transaction.
async fn replace_recipe_parts(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    draft: &RecipeDraft,
) -> Result<(), QueryError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    if !draft.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(draft.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(QueryError::from)?;
    }

    if !draft.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query_builder.push_values(draft.ingredients.iter(), |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.ingredient_id)
                .push_bind(part.amount);
        });
        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

#[async_trait]
impl RecipeStore for PgRepository {
    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        let recipe: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, text, cooking_time, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(author_id)
        .bind(&draft.name)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(&draft.image)
        .fetch_one(&mut *tr)
        .await
        .map_err(QueryError::from)?;

        replace_recipe_parts(&mut tr, recipe.id, draft).await?;

        tr.commit()
            .await
            .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
        Ok(recipe)
    }

    async fn update_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        let recipe: Recipe = sqlx::query_as(
            "
            UPDATE recipes SET
            name = $1,
            text = $2,
            cooking_time = $3,
            image = COALESCE($4, image)
            WHERE id = $5
            RETURNING *
        ",
        )
        .bind(&draft.name)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(&draft.image)
        .bind(id)
        .fetch_one(&mut *tr)
        .await
        .map_err(QueryError::from)?;

        replace_recipe_parts(&mut tr, id, draft).await?;

        tr.commit()
            .await
            .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, QueryError> {
        // recipe_ingredients, recipe_tags, favorites and wishlists cascade
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, QueryError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<RecipeIngredient>, QueryError> {
        let rows: Vec<RecipeIngredient> = sqlx::query_as(
            "
            SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
                i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY i.name COLLATE \"C\", i.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn find_recipes_by_name(&self, name: &str) -> Result<Vec<Id>, QueryError> {
        let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE name = $1")
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, QueryError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.* FROM recipes r");
        push_recipe_filter(&mut query_builder, filter);
        query_builder.push(" ORDER BY r.created DESC, r.id DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let rows: Vec<Recipe> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, QueryError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        push_recipe_filter(&mut query_builder, filter);

        let count: (i64,) = query_builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, QueryError> {
        // LIMIT NULL is no limit
        let rows: Vec<Recipe> = sqlx::query_as(
            "SELECT * FROM recipes WHERE author_id = $1 ORDER BY created DESC, id DESC LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, QueryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }
}
