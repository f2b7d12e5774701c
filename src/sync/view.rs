use std::{collections::VecDeque, mem};

use tracing::{debug, warn};
use uuid::Uuid;

use super::notice::Notice;
use crate::{
    error::{AppError, AppResult},
    gateway::{ChangeEvent, ChangeFeed, Gateway},
    shopping::{
        budget::{self, BudgetStatus},
        repo_types::{ItemPatch, ShoppingItem, ShoppingList},
        services,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// Local copy of one shopping list and its items.
///
/// Mutations are applied locally first and then written through the gateway; a failed
/// write is undone and reported as a [`Notice`]. Once loaded, the view follows the
/// list's change feed; pushed changes are applied in arrival order by
/// [`drain_changes`](Self::drain_changes) or [`next_change`](Self::next_change).
pub struct ShoppingListView {
    gw: Gateway,
    list: ShoppingList,
    items: Vec<ShoppingItem>,
    state: LoadState,
    feed: Option<ChangeFeed<ShoppingItem>>,
    notices: VecDeque<Notice>,
}

impl ShoppingListView {
    pub fn new(gw: Gateway, list: ShoppingList) -> Self {
        Self {
            gw,
            list,
            items: Vec::new(),
            state: LoadState::Unloaded,
            feed: None,
            notices: VecDeque::new(),
        }
    }

    pub fn list(&self) -> &ShoppingList {
        &self.list
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.feed.is_some()
    }

    /// Fetches the items and opens the change feed. On failure the view goes back to
    /// `Unloaded` with an error notice.
    pub async fn load(&mut self) -> AppResult<()> {
        self.state = LoadState::Loading;
        // Subscribe before fetching so nothing written in between is missed.
        let feed = services::subscribe_to_list(&self.gw, self.list.id);

        match services::get_items(&self.gw, self.list.id).await {
            Ok(items) => {
                self.items = items;
                self.feed = Some(feed);
                self.state = LoadState::Loaded;
                debug!(list_id = %self.list.id, items = self.items.len(), "list loaded");
                Ok(())
            }
            Err(e) => {
                self.state = LoadState::Unloaded;
                self.notices.push_back(Notice::error("Error loading items", e.to_string()));
                Err(e)
            }
        }
    }

    /// Patches local items by id. Last write wins.
    pub fn apply_change(&mut self, event: ChangeEvent<ShoppingItem>) {
        match event {
            ChangeEvent::Inserted(item) => {
                if !self.replace(item.clone()) {
                    self.items.push(item);
                }
            }
            ChangeEvent::Updated(item) => {
                if !self.replace(item) {
                    debug!("update for an item not in view ignored");
                }
            }
            ChangeEvent::Deleted(id) => self.items.retain(|i| i.id != id),
        }
    }

    /// Applies every change already buffered by the feed; returns how many.
    pub fn drain_changes(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(feed) = self.feed.as_mut() {
            while let Some(event) = feed.try_next() {
                pending.push(event);
            }
        }
        let n = pending.len();
        for event in pending {
            self.apply_change(event);
        }
        n
    }

    /// Waits for the next pushed change and applies it. `false` when there is no feed
    /// or it has closed.
    pub async fn next_change(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        match feed.next().await {
            Some(event) => {
                self.apply_change(event);
                true
            }
            None => {
                warn!(list_id = %self.list.id, "change feed closed");
                self.feed = None;
                false
            }
        }
    }

    /// Shows a temporary item right away and swaps in the stored row once it is back.
    pub async fn add_item(&mut self, name: &str, quantity: Option<&str>) -> AppResult<()> {
        let temp_id = Uuid::new_v4();
        self.items.push(ShoppingItem {
            id: temp_id,
            name: name.to_string(),
            quantity: services::normalize_quantity(quantity).to_string(),
            checked: false,
            price: None,
            list_id: self.list.id,
            created_at: None,
        });

        match services::add_item(&self.gw, self.list.id, name, quantity).await {
            Ok(item) => {
                if self.items.iter().any(|i| i.id == item.id) {
                    // the feed got here first
                    self.items.retain(|i| i.id != temp_id);
                } else if let Some(slot) = self.items.iter_mut().find(|i| i.id == temp_id) {
                    *slot = item;
                } else {
                    self.items.push(item);
                }
                Ok(())
            }
            Err(e) => {
                self.items.retain(|i| i.id != temp_id);
                self.notices.push_back(Notice::error("Error adding item", e.to_string()));
                Err(e)
            }
        }
    }

    pub async fn toggle_item(&mut self, item_id: Uuid) -> AppResult<()> {
        let prior = self.find(item_id)?.clone();
        let checked = !prior.checked;
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.checked = checked;
        }

        let patch = ItemPatch {
            checked: Some(checked),
            ..Default::default()
        };
        match services::update_item(&self.gw, item_id, &patch).await {
            Ok(item) => {
                self.replace(item);
                Ok(())
            }
            Err(e) => {
                self.replace(prior);
                self.notices.push_back(Notice::error("Error updating item", e.to_string()));
                Err(e)
            }
        }
    }

    /// A failed price write reloads the whole item list instead of reverting in place.
    pub async fn update_price(&mut self, item_id: Uuid, price: Option<f64>) -> AppResult<()> {
        self.find(item_id)?;
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.price = price;
        }

        let patch = ItemPatch {
            price: Some(price),
            ..Default::default()
        };
        match services::update_item(&self.gw, item_id, &patch).await {
            Ok(item) => {
                self.replace(item);
                Ok(())
            }
            Err(e) => {
                self.notices.push_back(Notice::error("Error updating price", e.to_string()));
                self.refetch().await;
                Err(e)
            }
        }
    }

    pub async fn delete_item(&mut self, item_id: Uuid) -> AppResult<()> {
        self.items.retain(|i| i.id != item_id);
        match services::delete_item(&self.gw, item_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.notices.push_back(Notice::error("Error deleting item", e.to_string()));
                self.refetch().await;
                Err(e)
            }
        }
    }

    pub async fn update_budget(&mut self, budget: Option<f64>) -> AppResult<()> {
        let previous = mem::replace(&mut self.list.budget, budget);
        match services::update_list_budget(&self.gw, self.list.id, budget).await {
            Ok(list) => {
                self.list = list;
                self.notices.push_back(Notice::success("Budget updated", "Your budget has been saved"));
                Ok(())
            }
            Err(e) => {
                self.list.budget = previous;
                self.notices.push_back(Notice::error("Error updating budget", e.to_string()));
                Err(e)
            }
        }
    }

    /// Recomputed from the local items on every call.
    pub fn total_spent(&self) -> f64 {
        budget::total_spent(&self.items)
    }

    pub fn budget_status(&self) -> Option<BudgetStatus> {
        BudgetStatus::compute(self.total_spent(), self.list.budget)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn find(&self, item_id: Uuid) -> AppResult<&ShoppingItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::NotFound("Item not found".into()))
    }

    fn replace(&mut self, item: ShoppingItem) -> bool {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    async fn refetch(&mut self) {
        match services::get_items(&self.gw, self.list.id).await {
            Ok(items) => self.items = items,
            Err(e) => {
                warn!(error = %e, list_id = %self.list.id, "refetch after failed write failed");
                self.notices.push_back(Notice::error("Error loading items", e.to_string()));
            }
        }
    }
}
