use async_trait::async_trait;

use super::PgRepository;
use crate::{
    error::QueryError,
    schema::{CartItem, Id, RelationKind},
    store::RelationStore,
};

#[async_trait]
impl RelationStore for PgRepository {
    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        let table = kind.table();
        let result = sqlx::query(&format!(
            "INSERT INTO {table} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        let table = kind.table();
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = $1 AND recipe_id = $2"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, QueryError> {
        let table = kind.table();
        let result: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT recipe_id FROM {table} WHERE user_id = $1 AND recipe_id = $2"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.is_some())
    }

    async fn list_cart_items(&self, user_id: Id) -> Result<Vec<CartItem>, QueryError> {
        let rows: Vec<CartItem> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM wishlists w
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = w.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE w.user_id = $1
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }
}
