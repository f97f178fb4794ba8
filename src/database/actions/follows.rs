use async_trait::async_trait;

use super::PgRepository;
use crate::{
    error::QueryError,
    schema::{Id, User},
    store::FollowStore,
};

#[async_trait]
impl FollowStore for PgRepository {
    async fn insert_follow(&self, user_id: Id, author_id: Id) -> Result<(), QueryError> {
        sqlx::query("INSERT INTO follows (user_id, author_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(())
    }

    async fn delete_follow(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, user_id: Id, author_id: Id) -> Result<bool, QueryError> {
        let result: Option<(Id,)> =
            sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
                .bind(user_id)
                .bind(author_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(result.is_some())
    }

    async fn list_followed_authors(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, QueryError> {
        let rows: Vec<User> = sqlx::query_as(
            "
            SELECT u.*
            FROM follows f
            INNER JOIN users u ON u.id = f.author_id
            WHERE f.user_id = $1
            ORDER BY u.id
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_followed_authors(&self, user_id: Id) -> Result<i64, QueryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }
}
