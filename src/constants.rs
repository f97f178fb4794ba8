pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const TAG_SLUG_MAX_LENGTH: usize = 50;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 100;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 100;
pub const RECIPE_NAME_MAX_LENGTH: usize = 200;

pub const SHOPPING_LIST_HEADER: &str = "Foodgram shopping list:";
pub const SHOPPING_LIST_FILE_PREFIX: &str = "shopping_cart";

pub const SESSION_LIFETIME_HOURS: i64 = 24;
