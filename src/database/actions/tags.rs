use async_trait::async_trait;

use super::PgRepository;
use crate::{
    error::QueryError,
    schema::{Id, NewTag, Tag},
    store::TagStore,
};

#[async_trait]
impl TagStore for PgRepository {
    async fn insert_tag(&self, tag: &NewTag) -> Result<Tag, QueryError> {
        let row: Tag =
            sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
                .bind(tag.name)
                .bind(&tag.color)
                .bind(&tag.slug)
                .fetch_one(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, QueryError> {
        let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, QueryError> {
        let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(list)
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, QueryError> {
        let list: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.*
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(list)
    }
}
