use log::info;

use super::find_user;
use crate::{
    constants::USER_COUNT_PER_PAGE,
    error::{ApiError, QueryErrorKind},
    form::UserForm,
    pagination::{Page, PageQuery},
    schema::Id,
    store::Repository,
    views::{user_view, UserView},
};

pub async fn register_user(repo: &dyn Repository, form: UserForm) -> Result<UserView, ApiError> {
    let new_user = form.validate()?;

    let user = repo.insert_user(&new_user).await.map_err(|e| match e.kind() {
        QueryErrorKind::UniqueViolation => {
            ApiError::Conflict("A user with that email or username already exists.".to_owned())
        }
        _ => e.into(),
    })?;
    info!("Registered user {} ({})", user.id, user.username);

    Ok(user_view(repo, user, None).await?)
}

pub async fn get_user(
    repo: &dyn Repository,
    viewer: Option<Id>,
    id: Id,
) -> Result<UserView, ApiError> {
    let user = find_user(repo, id).await?;

    Ok(user_view(repo, user, viewer).await?)
}

pub async fn me(repo: &dyn Repository, actor: Id) -> Result<UserView, ApiError> {
    get_user(repo, Some(actor), actor).await
}

pub async fn list_users(
    repo: &dyn Repository,
    viewer: Option<Id>,
    page: PageQuery,
) -> Result<Page<UserView>, ApiError> {
    let request = page.resolve(USER_COUNT_PER_PAGE);

    let total = repo.count_users().await?;
    let users = repo.list_users(request.limit(), request.offset()).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(user_view(repo, user, viewer).await?);
    }

    Ok(Page::from_rows(results, total, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{seed, MemoryRepository},
        store::FollowStore,
    };

    fn form(email: &str, username: &str) -> UserForm {
        UserForm {
            email: email.to_owned(),
            username: username.to_owned(),
            first_name: "Ann".to_owned(),
            last_name: "Baker".to_owned(),
        }
    }

    #[tokio::test]
    async fn registration_rejects_taken_identifiers() {
        let repo = MemoryRepository::new();

        let user = register_user(&repo, form("ann@foodgram.test", "ann"))
            .await
            .unwrap();
        let same_email = register_user(&repo, form("ann@foodgram.test", "other")).await;
        let same_username = register_user(&repo, form("other@foodgram.test", "ann")).await;

        assert_eq!(user.username, "ann");
        assert!(!user.is_subscribed);
        assert!(matches!(same_email, Err(ApiError::Conflict(_))));
        assert!(matches!(same_username, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn is_subscribed_depends_on_the_viewer() {
        let repo = MemoryRepository::new();
        let fan = seed::user(&repo, "fan").await;
        let cook = seed::user(&repo, "cook").await;
        repo.insert_follow(fan.id, cook.id).await.unwrap();

        assert!(get_user(&repo, Some(fan.id), cook.id).await.unwrap().is_subscribed);
        assert!(!get_user(&repo, None, cook.id).await.unwrap().is_subscribed);
        assert!(!me(&repo, cook.id).await.unwrap().is_subscribed);
        assert_eq!(
            get_user(&repo, None, 999).await.unwrap_err(),
            ApiError::not_found("User")
        );
    }

    #[tokio::test]
    async fn users_are_listed_by_id() {
        let repo = MemoryRepository::new();
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            seed::user(&repo, name).await;
        }

        let first = list_users(&repo, None, PageQuery::default()).await.unwrap();
        let second = list_users(
            &repo,
            None,
            PageQuery {
                page: Some(2),
                limit: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(first.count, 7);
        assert_eq!(first.results.len(), 6);
        assert_eq!(first.next, Some(2));
        assert_eq!(second.results[0].username, "g");
        assert!(first.results.windows(2).all(|w| w[0].id < w[1].id));
    }
}
