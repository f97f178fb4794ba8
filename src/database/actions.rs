mod follows;
mod ingredients;
mod recipes;
mod relations;
mod tags;
mod users;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::error::QueryError;
use crate::config::Config;

/// The Postgres-backed [`Repository`](super::store::Repository).
#[derive(Clone, Debug)]
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, QueryError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Escapes `LIKE` wildcards so user input only ever matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
