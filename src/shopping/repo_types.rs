use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use time::OffsetDateTime;
use uuid::Uuid;

use super::budget::BudgetStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: String,
    pub checked: bool,
    #[serde(default)]
    pub price: Option<f64>, // only counted once checked
    pub list_id: Uuid,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct NewList<'a> {
    pub name: &'a str,
    pub user_id: Uuid,
    pub budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NewItem<'a> {
    pub name: &'a str,
    pub quantity: &'a str,
    pub checked: bool,
    pub price: Option<f64>,
    pub list_id: Uuid,
}

/// Partial item update. `price: Some(None)` clears the price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub price: Option<Option<f64>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.quantity.is_none() && self.checked.is_none() && self.price.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetPatch {
    pub budget: Option<f64>,
}

/// A list together with what has been spent on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSummary {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub spent: f64,
    pub budget_status: Option<BudgetStatus>,
}
