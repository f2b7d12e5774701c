//! The remote data gateway: one handle to the hosted backend, shared by every service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::storage::{MemoryStorage, StorageClient};

pub mod feed;
pub mod memory;
pub mod postgres;
pub mod query;

pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, RowChange, RowFilter};
pub use memory::MemoryGateway;
pub use postgres::PgGateway;
pub use query::{Direction, Filter, Query, Table};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no rows returned for a single-row fetch")]
    NoRows,
    #[error("{0} rows returned for a single-row fetch")]
    TooManyRows(usize),
    #[error("invalid column name `{0}`")]
    InvalidColumn(String),
    #[error("refusing to {0} without a filter")]
    Unfiltered(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

/// Table-oriented access to the backing store. Rows travel as JSON objects.
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, GatewayError>;
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, GatewayError>;
    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, GatewayError>;
    async fn delete(&self, query: &Query) -> Result<u64, GatewayError>;
    fn changes(&self) -> broadcast::Receiver<RowChange>;
}

#[derive(Clone)]
pub struct Gateway {
    data: Arc<dyn DataGateway>,
    storage: Arc<dyn StorageClient>,
}

impl Gateway {
    pub fn new(data: Arc<dyn DataGateway>, storage: Arc<dyn StorageClient>) -> Self {
        Self { data, storage }
    }

    /// Gateway over [`MemoryGateway`] and [`MemoryStorage`], with the data side handed back
    /// for inspection and failure injection.
    pub fn in_memory() -> (Self, Arc<MemoryGateway>) {
        let data = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new("https://storage.local/cartpal-images"));
        (Self::new(data.clone(), storage), data)
    }

    pub fn storage(&self) -> &dyn StorageClient {
        self.storage.as_ref()
    }

    pub fn changes(&self) -> broadcast::Receiver<RowChange> {
        self.data.changes()
    }

    pub async fn select_as<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, GatewayError> {
        let rows = self.data.select(query).await?;
        decode_rows(rows)
    }

    /// Exactly one row, or [`GatewayError::NoRows`] / [`GatewayError::TooManyRows`].
    pub async fn fetch_one_as<T: DeserializeOwned>(&self, query: &Query) -> Result<T, GatewayError> {
        let mut rows = self.data.select(query).await?;
        match rows.len() {
            0 => Err(GatewayError::NoRows),
            1 => Ok(serde_json::from_value(rows.remove(0))?),
            n => Err(GatewayError::TooManyRows(n)),
        }
    }

    pub async fn fetch_optional_as<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>, GatewayError> {
        match self.fetch_one_as(query).await {
            Ok(row) => Ok(Some(row)),
            Err(GatewayError::NoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn insert_as<T, R>(&self, table: Table, rows: &[R]) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned,
        R: Serialize,
    {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        decode_rows(self.data.insert(table, rows).await?)
    }

    pub async fn update_as<T, P>(&self, query: &Query, patch: &P) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let patch = serde_json::to_value(patch)?;
        decode_rows(self.data.update(query, patch).await?)
    }

    pub async fn delete(&self, query: &Query) -> Result<u64, GatewayError> {
        self.data.delete(query).await
    }

    pub fn subscribe<T: DeserializeOwned>(&self, table: Table, filter: RowFilter) -> ChangeFeed<T> {
        ChangeFeed::new(self.data.changes(), table, filter)
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(GatewayError::from))
        .collect()
}

/// First row of a write that is expected to return one.
pub fn first_row<T>(rows: Vec<T>) -> Result<T, GatewayError> {
    rows.into_iter().next().ok_or(GatewayError::NoRows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[tokio::test]
    async fn fetch_one_distinguishes_zero_and_many() {
        let (gw, _) = Gateway::in_memory();
        gw.insert_as::<Value, _>(
            Table::Profiles,
            &[json!({"name": "Ann", "user_id": "ann"}), json!({"name": "Ann", "user_id": "ann2"})],
        )
        .await
        .unwrap();

        let none = Query::table(Table::Profiles).eq("name", "Bob");
        assert!(matches!(gw.fetch_one_as::<Named>(&none).await, Err(GatewayError::NoRows)));
        assert!(gw.fetch_optional_as::<Named>(&none).await.unwrap().is_none());

        let many = Query::table(Table::Profiles).eq("name", "Ann");
        assert!(matches!(
            gw.fetch_one_as::<Named>(&many).await,
            Err(GatewayError::TooManyRows(2))
        ));

        let one = Query::table(Table::Profiles).eq("user_id", "ann2");
        assert_eq!(gw.fetch_one_as::<Named>(&one).await.unwrap().name, "Ann");
    }

    #[test]
    fn first_row_of_empty_is_no_rows() {
        assert!(matches!(first_row::<Value>(vec![]), Err(GatewayError::NoRows)));
        assert_eq!(first_row(vec![1, 2]).unwrap(), 1);
    }
}
