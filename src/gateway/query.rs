use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GatewayError;

/// Tables reachable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    ShoppingLists,
    ShoppingItems,
    Recipes,
    RecipeIngredients,
    MealPlans,
}

impl Table {
    pub const fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::ShoppingLists => "shopping_lists",
            Table::ShoppingItems => "shopping_items",
            Table::Recipes => "recipes",
            Table::RecipeIngredients => "recipe_ingredients",
            Table::MealPlans => "meal_plans",
        }
    }

    pub const ALL: [Table; 6] = [
        Table::Profiles,
        Table::ShoppingLists,
        Table::ShoppingItems,
        Table::Recipes,
        Table::RecipeIngredients,
        Table::MealPlans,
    ];

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    Gte { column: String, value: Value },
    Lte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    NotNull { column: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. }
            | Filter::Gte { column, .. }
            | Filter::Lte { column, .. }
            | Filter::In { column, .. }
            | Filter::NotNull { column } => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A filtered, optionally projected and ordered request against one table.
///
/// ```ignore
/// Query::table(Table::ShoppingItems)
///     .eq("list_id", list_id.to_string())
///     .order("created_at", Direction::Asc);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// Restrict the returned objects to these columns. Empty means every column.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull {
            column: column.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Every identifier this query will splice into SQL.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(self.filters.iter().map(Filter::column))
            .chain(self.order.iter().map(|o| o.column.as_str()))
    }
}

/// Column names end up inside generated SQL, so only plain lowercase identifiers pass.
pub fn validate_column(name: &str) -> Result<(), GatewayError> {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
    }
    if IDENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(GatewayError::InvalidColumn(name.to_string()))
    }
}
