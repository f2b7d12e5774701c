use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{
    feed::{ChangeKind, RowChange, FEED_CAPACITY},
    query::{validate_column, Direction, Filter, Query, Table},
    DataGateway, GatewayError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// In-process gateway with the same filter and ordering rules as [`super::PgGateway`].
///
/// Inserted rows get an `id` and `created_at` when they carry none. Every call is
/// journaled, and [`MemoryGateway::fail_next`] makes the next matching call fail.
pub struct MemoryGateway {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    failures: Mutex<Vec<(Operation, Table)>>,
    journal: Mutex<Vec<(Operation, Table)>>,
    changes: broadcast::Sender<RowChange>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Mutex::new(HashMap::new()),
            failures: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            changes,
        }
    }

    pub fn fail_next(&self, op: Operation, table: Table) {
        lock(&self.failures).push((op, table));
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        lock(&self.tables).get(&table).cloned().unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<(Operation, Table)> {
        lock(&self.journal).clone()
    }

    fn begin(&self, op: Operation, table: Table) -> Result<(), GatewayError> {
        lock(&self.journal).push((op, table));
        let mut failures = lock(&self.failures);
        if let Some(pos) = failures.iter().position(|f| *f == (op, table)) {
            failures.remove(pos);
            debug!(?op, %table, "injected failure");
            return Err(GatewayError::Rejected(format!("simulated {op:?} failure on {table}")));
        }
        Ok(())
    }

    fn publish(&self, table: Table, kind: ChangeKind, record: Option<Value>, old_record: Option<Value>) {
        // No subscribers is not an error.
        let _ = self.changes.send(RowChange::new(table, kind, record, old_record));
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, GatewayError> {
        query.identifiers().try_for_each(validate_column)?;
        self.begin(Operation::Select, query.table)?;

        let tables = lock(&self.tables);
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| matches_all(&query.filters, r)).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(cell(a, &order.column), cell(b, &order.column));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if !query.columns.is_empty() {
            rows = rows
                .into_iter()
                .map(|row| {
                    let projected: Map<String, Value> = query
                        .columns
                        .iter()
                        .map(|c| (c.clone(), cell(&row, c).clone()))
                        .collect();
                    Value::Object(projected)
                })
                .collect();
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, GatewayError> {
        self.begin(Operation::Insert, table)?;

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut obj) = row else {
                return Err(GatewayError::Rejected(format!("insert into {table} expects objects")));
            };
            for column in obj.keys() {
                validate_column(column)?;
            }
            if obj.get("id").map_or(true, Value::is_null) {
                obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
            if obj.get("created_at").map_or(true, Value::is_null) {
                let now = OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .map_err(|e| GatewayError::Rejected(e.to_string()))?;
                obj.insert("created_at".into(), Value::String(now));
            }
            prepared.push(Value::Object(obj));
        }

        lock(&self.tables).entry(table).or_default().extend(prepared.iter().cloned());
        for row in &prepared {
            self.publish(table, ChangeKind::Insert, Some(row.clone()), None);
        }
        Ok(prepared)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, GatewayError> {
        query.identifiers().try_for_each(validate_column)?;
        if query.filters.is_empty() {
            return Err(GatewayError::Unfiltered("update"));
        }
        let Value::Object(patch) = patch else {
            return Err(GatewayError::Rejected("update patch must be an object".into()));
        };
        if patch.is_empty() {
            return Err(GatewayError::Rejected("update patch is empty".into()));
        }
        for column in patch.keys() {
            validate_column(column)?;
        }
        self.begin(Operation::Update, query.table)?;

        let mut changed = Vec::new();
        {
            let mut tables = lock(&self.tables);
            if let Some(rows) = tables.get_mut(&query.table) {
                for row in rows.iter_mut().filter(|r| matches_all(&query.filters, r)) {
                    let old = row.clone();
                    if let Value::Object(obj) = row {
                        for (k, v) in &patch {
                            obj.insert(k.clone(), v.clone());
                        }
                    }
                    changed.push((old, row.clone()));
                }
            }
        }

        let mut updated = Vec::with_capacity(changed.len());
        for (old, new) in changed {
            self.publish(query.table, ChangeKind::Update, Some(new.clone()), Some(old));
            updated.push(new);
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<u64, GatewayError> {
        query.identifiers().try_for_each(validate_column)?;
        if query.filters.is_empty() {
            return Err(GatewayError::Unfiltered("delete"));
        }
        self.begin(Operation::Delete, query.table)?;

        let removed: Vec<Value> = {
            let mut tables = lock(&self.tables);
            match tables.get_mut(&query.table) {
                Some(rows) => {
                    let (gone, kept) = rows.drain(..).partition(|r| matches_all(&query.filters, r));
                    *rows = kept;
                    gone
                }
                None => Vec::new(),
            }
        };

        let count = removed.len() as u64;
        for old in removed {
            self.publish(query.table, ChangeKind::Delete, None, Some(old));
        }
        Ok(count)
    }

    fn changes(&self) -> broadcast::Receiver<RowChange> {
        self.changes.subscribe()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn cell<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|f| matches(f, row))
}

/// SQL semantics: a NULL cell never satisfies a comparison.
fn matches(filter: &Filter, row: &Value) -> bool {
    let value = cell(row, filter.column());
    if value.is_null() {
        return false;
    }
    match filter {
        Filter::Eq { value: want, .. } => value == want,
        Filter::Gte { value: bound, .. } => compare_values(value, bound) != Ordering::Less,
        Filter::Lte { value: bound, .. } => compare_values(value, bound) != Ordering::Greater,
        Filter::In { values, .. } => values.contains(value),
        Filter::NotNull { .. } => true,
    }
}

/// Orders like Postgres would for the column types in use: numbers numerically,
/// timestamps chronologically, other strings lexically, NULL after everything.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (OffsetDateTime::parse(x, &Rfc3339), OffsetDateTime::parse(y, &Rfc3339)) {
                (Ok(p), Ok(q)) => p.cmp(&q),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_defaults_and_publishes() {
        let gw = MemoryGateway::new();
        let mut rx = gw.changes();
        let rows = gw
            .insert(Table::ShoppingLists, vec![json!({"name": "Groceries", "budget": null})])
            .await
            .unwrap();

        assert!(rows[0]["id"].is_string());
        assert!(rows[0]["created_at"].is_string());
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.table, "shopping_lists");
    }

    #[tokio::test]
    async fn select_filters_orders_and_projects() {
        let gw = MemoryGateway::new();
        gw.insert(
            Table::MealPlans,
            vec![
                json!({"user_id": "u", "date": "2024-05-03", "note": "c"}),
                json!({"user_id": "u", "date": "2024-05-01", "note": "a"}),
                json!({"user_id": "u", "date": "2024-05-09", "note": "out of range"}),
                json!({"user_id": "v", "date": "2024-05-02", "note": "other user"}),
            ],
        )
        .await
        .unwrap();

        let q = Query::table(Table::MealPlans)
            .columns(&["note"])
            .eq("user_id", "u")
            .gte("date", "2024-05-01")
            .lte("date", "2024-05-07")
            .order("date", Direction::Asc);
        let rows = gw.select(&q).await.unwrap();
        assert_eq!(rows, vec![json!({"note": "a"}), json!({"note": "c"})]);
    }

    #[tokio::test]
    async fn descending_order_puts_nulls_first() {
        let gw = MemoryGateway::new();
        gw.insert(
            Table::ShoppingItems,
            vec![json!({"name": "a", "price": 2.0}), json!({"name": "b", "price": null}), json!({"name": "c", "price": 10})],
        )
        .await
        .unwrap();
        let rows = gw
            .select(&Query::table(Table::ShoppingItems).columns(&["name"]).order("price", Direction::Desc))
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn in_and_not_null_filters() {
        let gw = MemoryGateway::new();
        gw.insert(
            Table::ShoppingItems,
            vec![
                json!({"list_id": "1", "price": 1.5}),
                json!({"list_id": "2", "price": null}),
                json!({"list_id": "3", "price": 4.0}),
            ],
        )
        .await
        .unwrap();
        let q = Query::table(Table::ShoppingItems)
            .is_in("list_id", ["1", "2"])
            .not_null("price");
        assert_eq!(gw.select(&q).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unfiltered_writes_are_refused() {
        let gw = MemoryGateway::new();
        let all = Query::table(Table::Recipes);
        assert!(matches!(gw.delete(&all).await, Err(GatewayError::Unfiltered("delete"))));
        assert!(matches!(
            gw.update(&all, json!({"name": "x"})).await,
            Err(GatewayError::Unfiltered("update"))
        ));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let gw = MemoryGateway::new();
        gw.fail_next(Operation::Insert, Table::Recipes);
        assert!(gw.insert(Table::Recipes, vec![json!({"name": "Soup"})]).await.is_err());
        assert!(gw.insert(Table::Recipes, vec![json!({"name": "Soup"})]).await.is_ok());
        assert_eq!(gw.rows(Table::Recipes).len(), 1);
        assert_eq!(
            gw.operations(),
            vec![(Operation::Insert, Table::Recipes), (Operation::Insert, Table::Recipes)]
        );
    }

    #[tokio::test]
    async fn update_and_delete_publish_old_rows() {
        let gw = MemoryGateway::new();
        let row = gw
            .insert(Table::ShoppingItems, vec![json!({"list_id": "L", "checked": false})])
            .await
            .unwrap()
            .remove(0);
        let id = row["id"].clone();
        let mut rx = gw.changes();

        let by_id = Query::table(Table::ShoppingItems).eq("id", id.clone());
        let updated = gw.update(&by_id, json!({"checked": true})).await.unwrap();
        assert_eq!(updated[0]["checked"], json!(true));
        assert_eq!(gw.delete(&by_id).await.unwrap(), 1);

        let upd = rx.recv().await.unwrap();
        assert_eq!(upd.old_record.unwrap()["checked"], json!(false));
        let del = rx.recv().await.unwrap();
        assert_eq!(del.kind, ChangeKind::Delete);
        assert_eq!(del.old_record.unwrap()["id"], id);
        assert!(gw.rows(Table::ShoppingItems).is_empty());
    }
}
