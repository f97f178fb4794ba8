use crate::{
    error::ApiError,
    form::{IngredientForm, TagForm},
    schema::{Id, Ingredient, Tag},
    store::Repository,
};

pub async fn list_tags(repo: &dyn Repository) -> Result<Vec<Tag>, ApiError> {
    Ok(repo.list_tags().await?)
}

pub async fn get_tag(repo: &dyn Repository, id: Id) -> Result<Tag, ApiError> {
    repo.get_tag(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))
}

pub async fn create_tag(repo: &dyn Repository, form: TagForm) -> Result<Tag, ApiError> {
    let tag = form.validate()?;

    Ok(repo.insert_tag(&tag).await?)
}

/// `name` narrows the list to ingredients whose name starts with it, ignoring case.
pub async fn list_ingredients(
    repo: &dyn Repository,
    name: Option<&str>,
) -> Result<Vec<Ingredient>, ApiError> {
    let prefix = name.map(str::trim).filter(|name| !name.is_empty());

    Ok(repo.list_ingredients(prefix).await?)
}

pub async fn get_ingredient(repo: &dyn Repository, id: Id) -> Result<Ingredient, ApiError> {
    repo.get_ingredient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient"))
}

pub async fn create_ingredient(
    repo: &dyn Repository,
    form: IngredientForm,
) -> Result<Ingredient, ApiError> {
    let ingredient = form.validate()?;

    Ok(repo.insert_ingredient(&ingredient).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{seed, MemoryRepository},
        schema::TagChoice,
    };

    #[tokio::test]
    async fn seeded_tags_are_listed() {
        let repo = MemoryRepository::new();

        let tags = list_tags(&repo).await.unwrap();

        let slugs: Vec<&str> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, ["breakfast", "lunch", "dinner"]);
        assert_eq!(get_tag(&repo, tags[1].id).await.unwrap().name, TagChoice::Lunch);
        assert_eq!(get_tag(&repo, 999).await, Err(ApiError::not_found("Tag")));
    }

    #[tokio::test]
    async fn tag_colors_and_slugs_are_unique() {
        let repo = MemoryRepository::new();

        let taken_color = create_tag(
            &repo,
            TagForm {
                name: "lunch".to_owned(),
                color: "#49B64E".to_owned(),
                slug: "second-lunch".to_owned(),
            },
        )
        .await;
        let created = create_tag(
            &repo,
            TagForm {
                name: "dinner".to_owned(),
                color: "#000000".to_owned(),
                slug: "supper".to_owned(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(taken_color, Err(ApiError::Conflict(_))));
        assert_eq!(created.slug, "supper");
    }

    #[tokio::test]
    async fn ingredients_are_searched_by_prefix() {
        let repo = MemoryRepository::new();
        seed::ingredient(&repo, "Sugar", "g").await;
        seed::ingredient(&repo, "salt", "g").await;
        seed::ingredient(&repo, "sugar", "tbsp").await;
        seed::ingredient(&repo, "flour", "g").await;

        let found = list_ingredients(&repo, Some("SU")).await.unwrap();
        let all = list_ingredients(&repo, Some("  ")).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|i| i.name.to_lowercase() == "sugar"));
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn ingredient_identity_is_name_and_unit() {
        let repo = MemoryRepository::new();
        let form = |unit: &str| IngredientForm {
            name: "milk".to_owned(),
            measurement_unit: unit.to_owned(),
        };

        let ml = create_ingredient(&repo, form("ml")).await.unwrap();
        create_ingredient(&repo, form("cup")).await.unwrap();
        let duplicate = create_ingredient(&repo, form("ml")).await;

        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
        assert_eq!(get_ingredient(&repo, ml.id).await.unwrap(), ml);
    }
}
