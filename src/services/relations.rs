use log::{trace, warn};

use super::find_recipe;
use crate::{
    error::{ApiError, QueryErrorKind},
    schema::{Id, RelationKind},
    store::Repository,
    views::RecipeSummary,
};

/// Puts the recipe into the actor's favorites or cart. Adding twice is not an error.
pub async fn add_relation(
    repo: &dyn Repository,
    kind: RelationKind,
    actor: Id,
    recipe_id: Id,
) -> Result<RecipeSummary, ApiError> {
    let recipe = find_recipe(repo, recipe_id).await?;

    match repo.insert_relation(kind, actor, recipe.id).await {
        Ok(true) => {}
        Ok(false) => trace!("Recipe {recipe_id} already in {kind} of user {actor}"),
        // Lost a race against an identical insert
        Err(e) if e.is_unique_violation() => {
            trace!("Recipe {recipe_id} added to {kind} of user {actor} concurrently")
        }
        // The recipe was just found, so the missing row is the actor
        Err(e) if e.kind() == QueryErrorKind::ForeignKeyViolation => {
            warn!("Relation insert for unknown user {actor}: {e}");
            return Err(ApiError::Unauthorized("User no longer exists.".to_owned()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_relation(
    repo: &dyn Repository,
    kind: RelationKind,
    actor: Id,
    recipe_id: Id,
) -> Result<(), ApiError> {
    let recipe = find_recipe(repo, recipe_id).await?;

    if !repo.delete_relation(kind, actor, recipe.id).await? {
        return Err(ApiError::NotFound(format!("Recipe is not in {kind}.")));
    }
    Ok(())
}
