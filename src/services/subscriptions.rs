use log::trace;

use super::find_user;
use crate::{
    constants::USER_COUNT_PER_PAGE,
    error::{ApiError, QueryErrorKind},
    pagination::{Page, PageQuery},
    schema::Id,
    store::Repository,
    views::{author_view, AuthorView},
};

fn check_recipes_limit(recipes_limit: Option<i64>) -> Result<(), ApiError> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(ApiError::validation(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0.",
        )),
        _ => Ok(()),
    }
}

pub async fn subscribe(
    repo: &dyn Repository,
    actor: Id,
    author_id: Id,
    recipes_limit: Option<i64>,
) -> Result<AuthorView, ApiError> {
    check_recipes_limit(recipes_limit)?;
    let author = find_user(repo, author_id).await?;

    if author.id == actor {
        return Err(ApiError::validation(
            "non_field_errors",
            "You cannot subscribe to yourself",
        ));
    }

    repo.insert_follow(actor, author.id)
        .await
        .map_err(|e| match e.kind() {
            QueryErrorKind::UniqueViolation => {
                ApiError::Conflict("You are already subscribed to this author".to_owned())
            }
            _ => e.into(),
        })?;
    trace!("User {actor} subscribed to {author_id}");

    Ok(author_view(repo, author, Some(actor), recipes_limit).await?)
}

pub async fn unsubscribe(repo: &dyn Repository, actor: Id, author_id: Id) -> Result<(), ApiError> {
    let author = find_user(repo, author_id).await?;

    if !repo.delete_follow(actor, author.id).await? {
        return Err(ApiError::NotFound(
            "You are not subscribed to this author.".to_owned(),
        ));
    }
    trace!("User {actor} unsubscribed from {author_id}");
    Ok(())
}

pub async fn subscriptions(
    repo: &dyn Repository,
    actor: Id,
    page: PageQuery,
    recipes_limit: Option<i64>,
) -> Result<Page<AuthorView>, ApiError> {
    check_recipes_limit(recipes_limit)?;
    let request = page.resolve(USER_COUNT_PER_PAGE);

    let total = repo.count_followed_authors(actor).await?;
    let authors = repo
        .list_followed_authors(actor, request.limit(), request.offset())
        .await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(author_view(repo, author, Some(actor), recipes_limit).await?);
    }

    Ok(Page::from_rows(results, total, request))
}
