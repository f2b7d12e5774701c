use std::{fmt, marker::PhantomData};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::warn;
use uuid::Uuid;

use super::{query::Table, GatewayError};

/// Capacity of the broadcast channel that fans row changes out to subscribers.
pub const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change as published by the backend trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
    /// Set by the trigger when the rows were cut down to their key columns to fit a
    /// NOTIFY payload.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// A decoded change for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "row", rename_all = "lowercase")]
pub enum ChangeEvent<T> {
    Inserted(T),
    Updated(T),
    Deleted(Uuid),
}

/// Equality filter on a single column, `list_id=eq.<id>` style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: &str, value: impl fmt::Display) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

impl RowChange {
    pub fn new(table: Table, kind: ChangeKind, record: Option<Value>, old_record: Option<Value>) -> Self {
        Self {
            table: table.name().to_string(),
            kind,
            record,
            old_record,
            truncated: false,
        }
    }

    /// Deletions are matched against the old row, everything else against the new one.
    pub fn matches(&self, table: Table, filter: &RowFilter) -> bool {
        if self.table != table.name() {
            return false;
        }
        let row = match self.kind {
            ChangeKind::Delete => self.old_record.as_ref(),
            ChangeKind::Insert | ChangeKind::Update => self.record.as_ref(),
        };
        row.is_some_and(|r| filter.matches(r))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<ChangeEvent<T>, GatewayError> {
        match self.kind {
            ChangeKind::Insert => Ok(ChangeEvent::Inserted(decode_row(self.record.as_ref())?)),
            ChangeKind::Update => Ok(ChangeEvent::Updated(decode_row(self.record.as_ref())?)),
            ChangeKind::Delete => {
                let id = self
                    .old_record
                    .as_ref()
                    .and_then(|r| r.get("id"))
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(ChangeEvent::Deleted(serde_json::from_value(id)?))
            }
        }
    }
}

fn decode_row<T: DeserializeOwned>(row: Option<&Value>) -> Result<T, GatewayError> {
    let row = row.cloned().unwrap_or(Value::Null);
    Ok(serde_json::from_value(row)?)
}

/// Typed subscription to one table narrowed by a [`RowFilter`]. Dropping it unsubscribes.
pub struct ChangeFeed<T> {
    rx: broadcast::Receiver<RowChange>,
    table: Table,
    filter: RowFilter,
    _row: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ChangeFeed<T> {
    pub fn new(rx: broadcast::Receiver<RowChange>, table: Table, filter: RowFilter) -> Self {
        Self {
            rx,
            table,
            filter,
            _row: PhantomData,
        }
    }

    pub fn filter(&self) -> &RowFilter {
        &self.filter
    }

    /// Waits for the next matching change. `None` once the gateway is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent<T>> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if let Some(event) = accept(self.table, &self.filter, change) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, filter = %self.filter, skipped, "change feed lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered matching change, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(change) => {
                    if let Some(event) = accept(self.table, &self.filter, change) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, filter = %self.filter, skipped, "change feed lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// The feed as a stream of matching changes, for server-sent events.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent<T>> + Send + 'static
    where
        T: Send + 'static,
    {
        let Self { rx, table, filter, .. } = self;
        BroadcastStream::new(rx).filter_map(move |result| match result {
            Ok(change) => accept(table, &filter, change),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(%table, %filter, skipped, "change feed lagged");
                None
            }
        })
    }
}

fn accept<T: DeserializeOwned>(table: Table, filter: &RowFilter, change: RowChange) -> Option<ChangeEvent<T>> {
    if !change.matches(table, filter) {
        return None;
    }
    match change.decode() {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, %table, "undecodable row change dropped");
            None
        }
    }
}
