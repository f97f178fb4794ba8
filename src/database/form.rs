use std::str::FromStr;

use serde::Deserialize;

use super::{
    error::{ApiError, FieldErrors},
    pagination::PageQuery,
    schema::{
        Id, IngredientAmount, NewIngredient, NewTag, NewUser, RecipeDraft, RecipeFilter,
        TagChoice,
    },
};
use crate::constants::{
    EMAIL_MAX_LENGTH, INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH, NAME_MAX_LENGTH,
    RECIPE_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max_length: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters."),
        );
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserForm {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "email", &self.email, EMAIL_MAX_LENGTH);
        if !errors.contains("email") && !is_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }

        check_text(&mut errors, "username", &self.username, USERNAME_MAX_LENGTH);
        if !errors.contains("username") && !is_username(&self.username) {
            errors.add(
                "username",
                "Enter a valid username. It may contain only letters, numbers and @/./+/-/_ characters.",
            );
        }

        check_text(&mut errors, "first_name", &self.first_name, NAME_MAX_LENGTH);
        check_text(&mut errors, "last_name", &self.last_name, NAME_MAX_LENGTH);

        errors.into_result(NewUser {
            email: self.email.trim().to_owned(),
            username: self.username,
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
        })
    }
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_username(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagForm {
    pub fn validate(self) -> Result<NewTag, ApiError> {
        let mut errors = FieldErrors::new();

        let name = TagChoice::try_from(self.name.as_str())
            .map_err(|_| errors.add("name", format!("\"{}\" is not a valid choice.", self.name)))
            .ok();

        let is_hex_color = self.color.len() == 7
            && self.color.starts_with('#')
            && self.color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex_color {
            errors.add("color", "Enter a HEX color code such as #49B64E.");
        }

        check_text(&mut errors, "slug", &self.slug, TAG_SLUG_MAX_LENGTH);
        let is_slug = self
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !errors.contains("slug") && !is_slug {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }

        match name {
            Some(name) => errors.into_result(NewTag {
                name,
                color: self.color,
                slug: self.slug,
            }),
            None => Err(ApiError::Validation(errors)),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(self) -> Result<NewIngredient, ApiError> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "name", &self.name, INGREDIENT_NAME_MAX_LENGTH);
        check_text(
            &mut errors,
            "measurement_unit",
            &self.measurement_unit,
            MEASUREMENT_UNIT_MAX_LENGTH,
        );

        errors.into_result(NewIngredient {
            name: self.name.trim().to_owned(),
            measurement_unit: self.measurement_unit.trim().to_owned(),
        })
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct IngredientAmountForm {
    pub id: Id,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmountForm>,
    pub tags: Vec<Id>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeForm {
    /// Checks everything that can be decided without the store.
    pub fn validate(self) -> Result<RecipeDraft, ApiError> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "name", &self.name, RECIPE_NAME_MAX_LENGTH);
        if self.text.trim().is_empty() {
            errors.add("text", "This field may not be blank.");
        }
        if self.cooking_time < 1 {
            errors.add("cooking_time", "Cooking time must be at least 1 minute.");
        }

        if self.ingredients.is_empty() {
            errors.add("ingredients", "A recipe needs at least one ingredient.");
        }
        let mut ingredients: Vec<IngredientAmount> = Vec::with_capacity(self.ingredients.len());
        for part in &self.ingredients {
            if part.amount < 1 {
                errors.add(
                    "ingredients",
                    format!("Amount of ingredient {} must be at least 1.", part.id),
                );
            }
            if ingredients.iter().any(|i| i.ingredient_id == part.id) {
                errors.add(
                    "ingredients",
                    format!("Ingredient {} is already added.", part.id),
                );
                continue;
            }
            ingredients.push(IngredientAmount {
                ingredient_id: part.id,
                amount: part.amount,
            });
        }

        if self.tags.is_empty() {
            errors.add("tags", "A recipe needs at least one tag.");
        }
        let mut tags: Vec<Id> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        errors.into_result(RecipeDraft {
            name: self.name.trim().to_owned(),
            text: self.text,
            cooking_time: self.cooking_time,
            image: self.image.filter(|image| !image.trim().is_empty()),
            tags,
            ingredients,
        })
    }
}

/// Query string of the recipe listing; `tags` may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub page: PageQuery,
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut query = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page.page = Some(get_number(&key, &value)?),
                "limit" => query.page.limit = Some(get_number(&key, &value)?),
                "author" => query.author = Some(get_number(&key, &value)?),
                "tags" => {
                    if !value.is_empty() && !query.tags.contains(&value) {
                        query.tags.push(value);
                    }
                }
                "is_favorited" => query.is_favorited = get_flag(&key, &value)?,
                "is_in_shopping_cart" => query.is_in_shopping_cart = get_flag(&key, &value)?,
                _ => {}
            }
        }

        Ok(query)
    }

    /// Favorite and cart filters only apply to a known viewer.
    pub fn filter(&self, viewer: Option<Id>) -> RecipeFilter {
        RecipeFilter {
            tags: self.tags.clone(),
            author: self.author,
            favorited_by: viewer.filter(|_| self.is_favorited),
            in_cart_of: viewer.filter(|_| self.is_in_shopping_cart),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

pub fn get_number<T>(key: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr,
{
    value
        .trim()
        .parse()
        .map_err(|_e| ApiError::validation(key, "A valid integer is required."))
}

pub fn get_flag(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" | "" => Ok(false),
        _ => Err(ApiError::validation(key, "Must be a valid boolean.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            ingredients: vec![
                IngredientAmountForm { id: 1, amount: 5 },
                IngredientAmountForm { id: 2, amount: 3 },
            ],
            tags: vec![1, 2, 1],
            image: Some(String::new()),
            name: " Pancakes ".to_owned(),
            text: "Mix and fry.".to_owned(),
            cooking_time: 20,
        }
    }

    fn field_errors(result: Result<impl std::fmt::Debug, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn recipe_form_is_normalized() {
        let draft = recipe_form().validate().unwrap();

        assert_eq!(draft.name, "Pancakes");
        assert_eq!(draft.tags, vec![1, 2]);
        assert_eq!(draft.image, None);
        assert_eq!(draft.ingredients.len(), 2);
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let mut form = recipe_form();
        form.ingredients.push(IngredientAmountForm { id: 1, amount: 7 });

        let errors = field_errors(form.validate());

        assert_eq!(errors.messages("ingredients"), ["Ingredient 1 is already added."]);
    }

    #[test]
    fn non_positive_numbers_are_rejected() {
        let mut form = recipe_form();
        form.cooking_time = 0;
        form.ingredients[1].amount = 0;

        let errors = field_errors(form.validate());

        assert!(errors.contains("cooking_time"));
        assert!(errors.contains("ingredients"));
    }

    #[test]
    fn empty_collections_are_rejected() {
        let mut form = recipe_form();
        form.ingredients.clear();
        form.tags.clear();
        form.text = "   ".to_owned();

        let errors = field_errors(form.validate());

        assert!(errors.contains("ingredients"));
        assert!(errors.contains("tags"));
        assert!(errors.contains("text"));
    }

    #[test]
    fn user_form_checks_email_and_username() {
        let form = UserForm {
            email: "not-an-email".to_owned(),
            username: "bad name".to_owned(),
            first_name: "Ann".to_owned(),
            last_name: String::new(),
        };

        let errors = field_errors(form.validate());

        assert!(errors.contains("email"));
        assert!(errors.contains("username"));
        assert!(errors.contains("last_name"));
        assert!(!errors.contains("first_name"));
    }

    #[test]
    fn tag_form_checks_choice_color_and_slug() {
        let form = TagForm {
            name: "brunch".to_owned(),
            color: "green".to_owned(),
            slug: "with space".to_owned(),
        };

        let errors = field_errors(form.validate());

        assert!(errors.contains("name"));
        assert!(errors.contains("color"));
        assert!(errors.contains("slug"));

        let tag = TagForm {
            name: "lunch".to_owned(),
            color: "#49B64E".to_owned(),
            slug: "late_lunch".to_owned(),
        }
        .validate()
        .unwrap();
        assert_eq!(tag.name, TagChoice::Lunch);
    }

    #[test]
    fn recipe_query_collects_repeated_tags() {
        let pairs = vec![
            ("tags".to_owned(), "breakfast".to_owned()),
            ("tags".to_owned(), "lunch".to_owned()),
            ("tags".to_owned(), "breakfast".to_owned()),
            ("author".to_owned(), "3".to_owned()),
            ("is_favorited".to_owned(), "1".to_owned()),
            ("page".to_owned(), "2".to_owned()),
        ];

        let query = RecipeQuery::from_pairs(pairs).unwrap();

        assert_eq!(query.tags, vec!["breakfast", "lunch"]);
        assert_eq!(query.author, Some(3));
        assert!(query.is_favorited);
        assert_eq!(query.page.page, Some(2));

        assert_eq!(query.filter(Some(7)).favorited_by, Some(7));
        assert_eq!(query.filter(None).favorited_by, None);
        assert_eq!(query.filter(Some(7)).in_cart_of, None);
    }

    #[test]
    fn recipe_query_rejects_malformed_values() {
        let pairs = vec![("author".to_owned(), "abc".to_owned())];
        assert!(RecipeQuery::from_pairs(pairs).is_err());

        let pairs = vec![("is_in_shopping_cart".to_owned(), "maybe".to_owned())];
        assert!(RecipeQuery::from_pairs(pairs).is_err());
    }
}
