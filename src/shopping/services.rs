use std::collections::HashMap;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    budget::{validate_budget, BudgetStatus},
    repo_types::{ItemPatch, ListSummary, NewItem, NewList, ShoppingItem, ShoppingList},
};
use crate::{
    error::{AppError, AppResult},
    gateway::{ChangeFeed, Gateway, RowFilter, Table},
};

pub const DEFAULT_QUANTITY: &str = "1";

/// Trimmed quantity, or "1" when none was given.
pub fn normalize_quantity(quantity: Option<&str>) -> &str {
    quantity
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_QUANTITY)
}

#[instrument(skip(gw), err)]
pub async fn get_lists(gw: &Gateway, owner: Uuid) -> AppResult<Vec<ShoppingList>> {
    Ok(ShoppingList::list_by_owner(gw, owner).await?)
}

#[instrument(skip(gw), err)]
pub async fn create_list(gw: &Gateway, owner: Uuid, name: &str, budget: Option<f64>) -> AppResult<ShoppingList> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("List name is required".into()));
    }
    validate_budget(budget).map_err(AppError::BadRequest)?;

    let list = ShoppingList::create(
        gw,
        &NewList {
            name,
            user_id: owner,
            budget,
        },
    )
    .await?;
    info!(list_id = %list.id, "shopping list created");
    Ok(list)
}

/// Items first, then the list itself.
#[instrument(skip(gw), err)]
pub async fn delete_list(gw: &Gateway, list_id: Uuid) -> AppResult<()> {
    let items = ShoppingItem::delete_by_list(gw, list_id).await?;
    ShoppingList::delete(gw, list_id).await?;
    info!(%list_id, items, "shopping list deleted");
    Ok(())
}

#[instrument(skip(gw), err)]
pub async fn get_items(gw: &Gateway, list_id: Uuid) -> AppResult<Vec<ShoppingItem>> {
    Ok(ShoppingItem::list_by_list(gw, list_id).await?)
}

/// New items start unchecked and unpriced. `quantity` defaults to "1".
#[instrument(skip(gw), err)]
pub async fn add_item(gw: &Gateway, list_id: Uuid, name: &str, quantity: Option<&str>) -> AppResult<ShoppingItem> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Item name is required".into()));
    }
    let quantity = normalize_quantity(quantity);

    let item = ShoppingItem::create(
        gw,
        &NewItem {
            name,
            quantity,
            checked: false,
            price: None,
            list_id,
        },
    )
    .await?;
    debug!(item_id = %item.id, "item added");
    Ok(item)
}

#[instrument(skip(gw), err)]
pub async fn update_item(gw: &Gateway, item_id: Uuid, patch: &ItemPatch) -> AppResult<ShoppingItem> {
    if patch.is_empty() {
        return Ok(ShoppingItem::find(gw, item_id).await?);
    }
    if let Some(Some(price)) = patch.price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::BadRequest("Price must be a non-negative amount".into()));
        }
    }
    Ok(ShoppingItem::update(gw, item_id, patch).await?)
}

#[instrument(skip(gw), err)]
pub async fn delete_item(gw: &Gateway, item_id: Uuid) -> AppResult<()> {
    ShoppingItem::delete(gw, item_id).await?;
    Ok(())
}

/// Live item changes of one list.
pub fn subscribe_to_list(gw: &Gateway, list_id: Uuid) -> ChangeFeed<ShoppingItem> {
    gw.subscribe(Table::ShoppingItems, RowFilter::eq("list_id", list_id))
}

/// Sum of prices over the list's checked items, aggregated on the backend side.
#[instrument(skip(gw), err)]
pub async fn get_total_spent(gw: &Gateway, list_id: Uuid) -> AppResult<f64> {
    let rows = ShoppingItem::checked_prices(gw, &[list_id]).await?;
    Ok(rows.iter().map(|r| r.price).sum())
}

#[instrument(skip(gw), err)]
pub async fn update_list_budget(gw: &Gateway, list_id: Uuid, budget: Option<f64>) -> AppResult<ShoppingList> {
    validate_budget(budget).map_err(AppError::BadRequest)?;
    let list = ShoppingList::set_budget(gw, list_id, budget).await?;
    info!(%list_id, ?budget, "budget updated");
    Ok(list)
}

/// Every list of the owner with its spending, from a single item query.
#[instrument(skip(gw), err)]
pub async fn list_summaries(gw: &Gateway, owner: Uuid) -> AppResult<Vec<ListSummary>> {
    let lists = ShoppingList::list_by_owner(gw, owner).await?;
    let ids: Vec<Uuid> = lists.iter().map(|l| l.id).collect();

    let mut spent_by_list: HashMap<Uuid, f64> = HashMap::new();
    for row in ShoppingItem::checked_prices(gw, &ids).await? {
        *spent_by_list.entry(row.list_id).or_default() += row.price;
    }

    Ok(lists
        .into_iter()
        .map(|list| {
            let spent = spent_by_list.get(&list.id).copied().unwrap_or_default();
            ListSummary {
                budget_status: BudgetStatus::compute(spent, list.budget),
                spent,
                list,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{memory::Operation, ChangeEvent};

    fn owner() -> Uuid {
        Uuid::new_v4()
    }

    #[tokio::test]
    async fn groceries_list_total_and_status() {
        let (gw, _) = Gateway::in_memory();
        let me = owner();
        let list = create_list(&gw, me, "Groceries", Some(50.0)).await.unwrap();
        let milk = add_item(&gw, list.id, "Milk", None).await.unwrap();
        add_item(&gw, list.id, "Bread", Some("2")).await.unwrap();
        assert_eq!(milk.quantity, DEFAULT_QUANTITY);
        assert!(!milk.checked);

        update_item(
            &gw,
            milk.id,
            &ItemPatch {
                checked: Some(true),
                price: Some(Some(4.5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(get_total_spent(&gw, list.id).await.unwrap(), 4.5);

        let summaries = list_summaries(&gw, me).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let status = summaries[0].budget_status.unwrap();
        assert_eq!(status.spent, 4.5);
        assert!(!status.over_budget);
    }

    #[test]
    fn quantity_is_trimmed_or_defaulted() {
        assert_eq!(normalize_quantity(None), "1");
        assert_eq!(normalize_quantity(Some("")), "1");
        assert_eq!(normalize_quantity(Some("   ")), "1");
        assert_eq!(normalize_quantity(Some(" 2 kg ")), "2 kg");
    }

    #[tokio::test]
    async fn items_come_back_oldest_first() {
        let (gw, _) = Gateway::in_memory();
        let list = create_list(&gw, owner(), "Weekend", None).await.unwrap();
        for name in ["A", "B", "C"] {
            add_item(&gw, list.id, name, None).await.unwrap();
        }
        let names: Vec<_> = get_items(&gw, list.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn negative_budget_never_reaches_the_backend() {
        let (gw, mem) = Gateway::in_memory();
        let err = create_list(&gw, owner(), "Groceries", Some(-5.0)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(mem.operations().is_empty());

        let list = create_list(&gw, owner(), "Groceries", Some(0.0)).await.unwrap();
        assert!(update_list_budget(&gw, list.id, Some(-1.0)).await.is_err());
        let cleared = update_list_budget(&gw, list.id, None).await.unwrap();
        assert_eq!(cleared.budget, None);
    }

    #[tokio::test]
    async fn delete_list_removes_items_first() {
        let (gw, mem) = Gateway::in_memory();
        let list = create_list(&gw, owner(), "Groceries", None).await.unwrap();
        add_item(&gw, list.id, "Milk", None).await.unwrap();
        let before = mem.operations().len();

        delete_list(&gw, list.id).await.unwrap();
        assert_eq!(
            mem.operations()[before..],
            [(Operation::Delete, Table::ShoppingItems), (Operation::Delete, Table::ShoppingLists)]
        );
        assert!(mem.rows(Table::ShoppingItems).is_empty());
        assert!(mem.rows(Table::ShoppingLists).is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_item_is_not_found() {
        let (gw, _) = Gateway::in_memory();
        let err = update_item(
            &gw,
            Uuid::new_v4(),
            &ItemPatch {
                checked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn backend_message_is_surfaced() {
        let (gw, mem) = Gateway::in_memory();
        mem.fail_next(Operation::Select, Table::ShoppingLists);
        let err = get_lists(&gw, owner()).await.unwrap_err();
        assert!(matches!(err, AppError::Backend(ref m) if m.contains("simulated")));
    }

    #[tokio::test]
    async fn subscription_only_sees_its_list() {
        let (gw, _) = Gateway::in_memory();
        let me = owner();
        let mine = create_list(&gw, me, "Mine", None).await.unwrap();
        let other = create_list(&gw, me, "Other", None).await.unwrap();
        let mut feed = subscribe_to_list(&gw, mine.id);

        add_item(&gw, other.id, "Noise", None).await.unwrap();
        let milk = add_item(&gw, mine.id, "Milk", None).await.unwrap();
        delete_item(&gw, milk.id).await.unwrap();

        assert_eq!(feed.try_next(), Some(ChangeEvent::Inserted(milk.clone())));
        assert_eq!(feed.try_next(), Some(ChangeEvent::Deleted(milk.id)));
        assert_eq!(feed.try_next(), None);
    }
}
