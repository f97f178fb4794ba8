use async_trait::async_trait;

use super::{escape_like, PgRepository};
use crate::{
    error::QueryError,
    schema::{Id, Ingredient, NewIngredient},
    store::IngredientStore,
};

#[async_trait]
impl IngredientStore for PgRepository {
    async fn insert_ingredient(
        &self,
        ingredient: &NewIngredient,
    ) -> Result<Ingredient, QueryError> {
        let row: Ingredient = sqlx::query_as(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING *
        ",
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .fetch_one(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, QueryError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, QueryError> {
        let rows: Vec<Ingredient> = match prefix {
            Some(prefix) => {
                sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name COLLATE \"C\", id")
                    .bind(format!("{}%", escape_like(prefix)))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(QueryError::from)?
            }
            None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name COLLATE \"C\", id")
                .fetch_all(&self.pool)
                .await
                .map_err(QueryError::from)?,
        };

        Ok(rows)
    }
}
