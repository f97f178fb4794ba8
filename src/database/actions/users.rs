use async_trait::async_trait;

use super::PgRepository;
use crate::{
    error::QueryError,
    schema::{Id, NewUser, User},
    store::UserStore,
};

#[async_trait]
impl UserStore for PgRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<User, QueryError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        ",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, QueryError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, QueryError> {
        let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_users(&self) -> Result<i64, QueryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }
}
