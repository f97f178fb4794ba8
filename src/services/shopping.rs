use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use chrono::NaiveDate;

use crate::{
    constants::{SHOPPING_LIST_FILE_PREFIX, SHOPPING_LIST_HEADER},
    error::ApiError,
    schema::{CartItem, Id},
    store::Repository,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Cart ingredients summed per (name, unit), ordered by name then unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    lines: Vec<ShoppingLine>,
}

impl ShoppingList {
    pub fn aggregate(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for item in items {
            *totals
                .entry((item.name, item.measurement_unit))
                .or_default() += i64::from(item.amount);
        }

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingLine {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self { lines }
    }

    pub fn lines(&self) -> &[ShoppingLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `shopping_cart_YYYYMMDD.txt`
    pub fn file_name(date: NaiveDate) -> String {
        format!("{}_{}.txt", SHOPPING_LIST_FILE_PREFIX, date.format("%Y%m%d"))
    }
}

impl Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHOPPING_LIST_HEADER}")?;
        for line in &self.lines {
            write!(
                f,
                "\n{} - {} {}",
                line.name, line.amount, line.measurement_unit
            )?;
        }
        Ok(())
    }
}

pub async fn shopping_list(repo: &dyn Repository, actor: Id) -> Result<ShoppingList, ApiError> {
    let items = repo.list_cart_items(actor).await?;

    Ok(ShoppingList::aggregate(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{seed, MemoryRepository},
        schema::RelationKind,
        store::RelationStore,
    };

    fn item(name: &str, unit: &str, amount: i32) -> CartItem {
        CartItem {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[test]
    fn amounts_are_summed_per_name_and_unit() {
        let list = ShoppingList::aggregate(vec![
            item("sugar", "g", 100),
            item("flour", "g", 500),
            item("sugar", "g", 50),
            item("sugar", "tbsp", 2),
        ]);

        assert_eq!(
            list.to_string(),
            "Foodgram shopping list:\nflour - 500 g\nsugar - 150 g\nsugar - 2 tbsp"
        );
    }

    #[test]
    fn one_line_per_ingredient() {
        let list = ShoppingList::aggregate(vec![item("Salt", "g", 5), item("Salt", "g", 3)]);

        assert_eq!(
            list.lines(),
            [ShoppingLine {
                name: "Salt".to_owned(),
                measurement_unit: "g".to_owned(),
                amount: 8,
            }]
        );
    }

    #[test]
    fn large_amounts_do_not_overflow() {
        let list = ShoppingList::aggregate(vec![
            item("rice", "g", i32::MAX),
            item("rice", "g", i32::MAX),
        ]);

        assert_eq!(list.lines()[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn empty_cart_renders_header_only() {
        let list = ShoppingList::aggregate(Vec::new());

        assert!(list.is_empty());
        assert_eq!(list.to_string(), SHOPPING_LIST_HEADER);
    }

    #[test]
    fn file_name_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        assert_eq!(ShoppingList::file_name(date), "shopping_cart_20240307.txt");
    }

    #[tokio::test]
    async fn list_covers_every_recipe_in_the_cart() {
        let repo = MemoryRepository::new();
        let cook = seed::user(&repo, "cook").await;
        let other = seed::user(&repo, "other").await;
        let sugar = seed::ingredient(&repo, "sugar", "g").await;
        let eggs = seed::ingredient(&repo, "eggs", "pcs").await;
        let cake = seed::recipe(&repo, cook.id, "Cake", &[(sugar.id, 200), (eggs.id, 3)]).await;
        let cookies = seed::recipe(&repo, cook.id, "Cookies", &[(sugar.id, 100)]).await;
        let pie = seed::recipe(&repo, cook.id, "Pie", &[(eggs.id, 2)]).await;

        for recipe in [cake.id, cookies.id] {
            repo.insert_relation(RelationKind::ShoppingCart, cook.id, recipe)
                .await
                .unwrap();
        }
        repo.insert_relation(RelationKind::ShoppingCart, other.id, pie.id)
            .await
            .unwrap();

        let list = shopping_list(&repo, cook.id).await.unwrap();

        assert_eq!(
            list.to_string(),
            "Foodgram shopping list:\neggs - 3 pcs\nsugar - 300 g"
        );
        assert!(shopping_list(&repo, 999).await.unwrap().is_empty());
    }
}
