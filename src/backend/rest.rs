//! Hosted-platform client: PostgREST-shaped table operations over HTTP and
//! a websocket realtime channel feeding [`ChangeEvent`]s.
//!
//! No retry or backoff lives here — a failed call surfaces as
//! [`BackendError`] and the caller decides what to show the user. On
//! realtime connection loss the read loop ends, the connected flag drops to
//! false, and events stop until the consumer reconnects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use super::{ChangeEvent, ChangeFeed, ChangeOp, EqFilter, Table, TableBackend};
use crate::config::BackendConfig;
use crate::error::BackendError;

const FEED_CAPACITY: usize = 64;

pub struct RestBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: reqwest::Method, table: Table) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.config.table_url(table.as_str()))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(BackendError::Constraint(message));
        }
        Err(BackendError::Status {
            code: status.as_u16(),
            message,
        })
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<Value>, BackendError> {
        let body: Value = Self::check(response).await?.json().await?;
        match body {
            Value::Array(rows) => Ok(rows),
            // Single-object representation; normalize to a one-row list.
            other => Ok(vec![other]),
        }
    }
}

/// Render a JSON value as a PostgREST `eq.` operand.
fn eq_param(value: &Value) -> String {
    match value {
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

fn filter_query(filter: &EqFilter) -> Vec<(String, String)> {
    filter
        .iter()
        .map(|(column, value)| (column.clone(), eq_param(value)))
        .collect()
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(&self, table: Table, filter: &EqFilter) -> Result<Vec<Value>, BackendError> {
        let response = self
            .request(reqwest::Method::GET, table)
            .query(&filter_query(filter))
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        let response = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let mut rows = Self::rows(response).await?;
        rows.pop()
            .ok_or_else(|| BackendError::Status {
                code: 500,
                message: "insert returned no representation".into(),
            })
    }

    async fn update(
        &self,
        table: Table,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, BackendError> {
        let response = self
            .request(reqwest::Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        let mut rows = Self::rows(response).await?;
        Ok(rows.pop())
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, BackendError> {
        let response = self
            .request(reqwest::Method::DELETE, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows = Self::rows(response).await?;
        Ok(!rows.is_empty())
    }
}

// ═══════════════════════════════════════════
// Realtime change feed
// ═══════════════════════════════════════════

/// Frame sent to subscribe to a table's row changes.
fn subscribe_frame(table: Table) -> String {
    json!({ "event": "subscribe", "table": table.as_str() }).to_string()
}

/// Parse an incoming change notification.
///
/// Expected shape: `{"table": "...", "type": "INSERT|UPDATE|DELETE",
/// "record": {"id": ...}}` (`old_record` carries the id on deletes).
/// Anything else — acks, heartbeats, unknown tables — is ignored.
fn parse_change_frame(text: &str) -> Option<ChangeEvent> {
    let frame: Value = serde_json::from_str(text).ok()?;
    let table = Table::from_name(frame.get("table")?.as_str()?)?;
    let op = match frame.get("type")?.as_str()? {
        "INSERT" => ChangeOp::Insert,
        "UPDATE" => ChangeOp::Update,
        "DELETE" => ChangeOp::Delete,
        _ => return None,
    };
    let row_id = frame
        .get("record")
        .or_else(|| frame.get("old_record"))
        .and_then(|record| record.get("id"))
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok());
    Some(ChangeEvent { table, op, row_id })
}

/// Websocket consumer of the backend's row-change notifications.
///
/// Owns the read-loop task; dropping the client closes the channel.
pub struct RealtimeClient {
    feeds: HashMap<Table, broadcast::Sender<ChangeEvent>>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RealtimeClient {
    /// Connect and subscribe to row changes for `tables`.
    pub async fn connect(config: &BackendConfig, tables: &[Table]) -> Result<Self, BackendError> {
        let (ws, _) = connect_async(config.realtime_url())
            .await
            .map_err(|e| BackendError::Realtime(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        for &table in tables {
            write
                .send(Message::Text(subscribe_frame(table)))
                .await
                .map_err(|e| BackendError::Realtime(e.to_string()))?;
        }

        let mut feeds = HashMap::new();
        for table in Table::ALL {
            let (tx, _) = broadcast::channel(FEED_CAPACITY);
            feeds.insert(table, tx);
        }

        let connected = Arc::new(AtomicBool::new(true));
        let task = {
            let feeds = feeds.clone();
            let connected = Arc::clone(&connected);
            tokio::spawn(async move {
                while let Some(message) = read.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            if let Some(event) = parse_change_frame(&text) {
                                if let Some(tx) = feeds.get(&event.table) {
                                    let _ = tx.send(event);
                                }
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "realtime stream error");
                            break;
                        }
                    }
                }
                connected.store(false, Ordering::Relaxed);
                tracing::warn!("realtime change feed disconnected");
            })
        };

        Ok(Self {
            feeds,
            connected,
            task,
        })
    }
}

impl ChangeFeed for RealtimeClient {
    fn changes(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.feeds[&table].subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_param_leaves_strings_bare() {
        assert_eq!(eq_param(&json!("active")), "eq.active");
        assert_eq!(eq_param(&json!(150)), "eq.150");
        assert_eq!(eq_param(&json!(true)), "eq.true");
    }

    #[test]
    fn filter_query_preserves_column_order() {
        let mut filter = EqFilter::new();
        filter.insert("status".into(), json!("scheduled"));
        filter.insert("date".into(), json!("2025-03-14"));
        let pairs = filter_query(&filter);
        // BTreeMap order: date before status.
        assert_eq!(pairs[0], ("date".into(), "eq.2025-03-14".into()));
        assert_eq!(pairs[1], ("status".into(), "eq.scheduled".into()));
    }

    #[test]
    fn change_frame_parses_insert_with_record_id() {
        let id = Uuid::new_v4();
        let frame = json!({
            "table": "appointments",
            "type": "INSERT",
            "record": {"id": id.to_string(), "service": "Consulta"}
        })
        .to_string();
        let event = parse_change_frame(&frame).unwrap();
        assert_eq!(event.table, Table::Appointments);
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.row_id, Some(id));
    }

    #[test]
    fn change_frame_delete_uses_old_record() {
        let id = Uuid::new_v4();
        let frame = json!({
            "table": "patients",
            "type": "DELETE",
            "old_record": {"id": id.to_string()}
        })
        .to_string();
        let event = parse_change_frame(&frame).unwrap();
        assert_eq!(event.op, ChangeOp::Delete);
        assert_eq!(event.row_id, Some(id));
    }

    #[test]
    fn non_change_frames_are_ignored() {
        assert!(parse_change_frame("not json").is_none());
        assert!(parse_change_frame(r#"{"event":"heartbeat"}"#).is_none());
        assert!(
            parse_change_frame(r#"{"table":"unknown","type":"INSERT"}"#).is_none(),
            "unknown table must not panic"
        );
    }

    #[test]
    fn subscribe_frame_names_the_table() {
        let frame: Value = serde_json::from_str(&subscribe_frame(Table::Budgets)).unwrap();
        assert_eq!(frame["table"], "budgets");
        assert_eq!(frame["event"], "subscribe");
    }
}
