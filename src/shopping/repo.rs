use serde::Deserialize;
use uuid::Uuid;

use super::repo_types::{BudgetPatch, ItemPatch, NewItem, NewList, ShoppingItem, ShoppingList};
use crate::gateway::{first_row, Direction, Gateway, GatewayError, Query, Table};

#[derive(Debug, Deserialize)]
pub struct PricedRow {
    pub list_id: Uuid,
    pub price: f64,
}

impl ShoppingList {
    pub async fn list_by_owner(gw: &Gateway, owner: Uuid) -> Result<Vec<ShoppingList>, GatewayError> {
        gw.select_as(
            &Query::table(Table::ShoppingLists)
                .eq("user_id", owner.to_string())
                .order("created_at", Direction::Desc),
        )
        .await
    }

    pub async fn create(gw: &Gateway, new: &NewList<'_>) -> Result<ShoppingList, GatewayError> {
        first_row(gw.insert_as(Table::ShoppingLists, std::slice::from_ref(new)).await?)
    }

    pub async fn delete(gw: &Gateway, id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&Query::table(Table::ShoppingLists).eq("id", id.to_string()))
            .await
    }

    pub async fn set_budget(gw: &Gateway, id: Uuid, budget: Option<f64>) -> Result<ShoppingList, GatewayError> {
        let rows = gw
            .update_as(
                &Query::table(Table::ShoppingLists).eq("id", id.to_string()),
                &BudgetPatch { budget },
            )
            .await?;
        first_row(rows)
    }
}

impl ShoppingItem {
    pub async fn list_by_list(gw: &Gateway, list_id: Uuid) -> Result<Vec<ShoppingItem>, GatewayError> {
        gw.select_as(
            &Query::table(Table::ShoppingItems)
                .eq("list_id", list_id.to_string())
                .order("created_at", Direction::Asc),
        )
        .await
    }

    pub async fn find(gw: &Gateway, id: Uuid) -> Result<ShoppingItem, GatewayError> {
        gw.fetch_one_as(&Query::table(Table::ShoppingItems).eq("id", id.to_string()))
            .await
    }

    pub async fn create(gw: &Gateway, new: &NewItem<'_>) -> Result<ShoppingItem, GatewayError> {
        first_row(gw.insert_as(Table::ShoppingItems, std::slice::from_ref(new)).await?)
    }

    pub async fn update(gw: &Gateway, id: Uuid, patch: &ItemPatch) -> Result<ShoppingItem, GatewayError> {
        let rows = gw
            .update_as(&Query::table(Table::ShoppingItems).eq("id", id.to_string()), patch)
            .await?;
        first_row(rows)
    }

    pub async fn delete(gw: &Gateway, id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&Query::table(Table::ShoppingItems).eq("id", id.to_string()))
            .await
    }

    pub async fn delete_by_list(gw: &Gateway, list_id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&Query::table(Table::ShoppingItems).eq("list_id", list_id.to_string()))
            .await
    }

    /// `(list_id, price)` of every checked, priced item in the given lists.
    pub async fn checked_prices(gw: &Gateway, list_ids: &[Uuid]) -> Result<Vec<PricedRow>, GatewayError> {
        if list_ids.is_empty() {
            return Ok(Vec::new());
        }
        gw.select_as(
            &Query::table(Table::ShoppingItems)
                .columns(&["list_id", "price"])
                .is_in("list_id", list_ids.iter().map(Uuid::to_string))
                .eq("checked", true)
                .not_null("price"),
        )
        .await
    }
}
