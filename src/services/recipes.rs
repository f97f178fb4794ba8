use std::collections::BTreeSet;

use log::info;

use super::{find_recipe, find_user};
use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, FieldErrors},
    form::{RecipeForm, RecipeQuery},
    pagination::Page,
    schema::{Id, Recipe, RecipeDraft},
    store::Repository,
    views::{recipe_view, RecipeView},
};

/// Checks that need the store: referenced rows exist and no other recipe
/// shares both the name and the ingredient set.
async fn validate_draft(
    repo: &dyn Repository,
    draft: &RecipeDraft,
    editing: Option<Id>,
) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();

    for part in &draft.ingredients {
        if repo.get_ingredient(part.ingredient_id).await?.is_none() {
            errors.add(
                "ingredients",
                format!("Ingredient {} does not exist.", part.ingredient_id),
            );
        }
    }
    for tag_id in &draft.tags {
        if repo.get_tag(*tag_id).await?.is_none() {
            errors.add("tags", format!("Tag {tag_id} does not exist."));
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let ingredient_ids: BTreeSet<Id> = draft.ingredients.iter().map(|i| i.ingredient_id).collect();
    for recipe_id in repo.find_recipes_by_name(&draft.name).await? {
        if Some(recipe_id) == editing {
            continue;
        }
        let existing: BTreeSet<Id> = repo
            .list_recipe_ingredients(recipe_id)
            .await?
            .into_iter()
            .map(|part| part.ingredient_id)
            .collect();
        if existing == ingredient_ids {
            return Err(ApiError::validation(
                "non_field_errors",
                "A recipe with this name and these ingredients already exists.",
            ));
        }
    }

    Ok(())
}

async fn find_own_recipe(repo: &dyn Repository, actor: Id, id: Id) -> Result<Recipe, ApiError> {
    let recipe = find_recipe(repo, id).await?;

    if recipe.author_id != actor {
        return Err(ApiError::Forbidden(
            "Only the author can change this recipe.".to_owned(),
        ));
    }
    Ok(recipe)
}

pub async fn list_recipes(
    repo: &dyn Repository,
    viewer: Option<Id>,
    query: &RecipeQuery,
) -> Result<Page<RecipeView>, ApiError> {
    let request = query.page.resolve(RECIPE_COUNT_PER_PAGE);
    let filter = query.filter(viewer);

    let total = repo.count_recipes(&filter).await?;
    let recipes = repo
        .list_recipes(&filter, request.limit(), request.offset())
        .await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(recipe_view(repo, recipe, viewer).await?);
    }

    Ok(Page::from_rows(results, total, request))
}

pub async fn get_recipe(
    repo: &dyn Repository,
    viewer: Option<Id>,
    id: Id,
) -> Result<RecipeView, ApiError> {
    let recipe = find_recipe(repo, id).await?;

    recipe_view(repo, recipe, viewer).await
}

pub async fn create_recipe(
    repo: &dyn Repository,
    actor: Id,
    form: RecipeForm,
) -> Result<RecipeView, ApiError> {
    let draft = form.validate()?;
    find_user(repo, actor).await?;
    validate_draft(repo, &draft, None).await?;

    let recipe = repo.insert_recipe(actor, &draft).await?;
    info!("User {actor} published recipe {}", recipe.id);

    recipe_view(repo, recipe, Some(actor)).await
}

pub async fn update_recipe(
    repo: &dyn Repository,
    actor: Id,
    id: Id,
    form: RecipeForm,
) -> Result<RecipeView, ApiError> {
    let recipe = find_own_recipe(repo, actor, id).await?;
    let draft = form.validate()?;
    validate_draft(repo, &draft, Some(recipe.id)).await?;

    let recipe = repo.update_recipe(recipe.id, &draft).await?;

    recipe_view(repo, recipe, Some(actor)).await
}

pub async fn delete_recipe(repo: &dyn Repository, actor: Id, id: Id) -> Result<(), ApiError> {
    let recipe = find_own_recipe(repo, actor, id).await?;

    if !repo.delete_recipe(recipe.id).await? {
        return Err(ApiError::not_found("Recipe"));
    }
    info!("User {actor} deleted recipe {id}");
    Ok(())
}
