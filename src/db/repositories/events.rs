use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Row};
use serde_json::{json, Value};

use crate::db::{
    helpers::{conversion_error, from_json_column, from_optional_json_column, require, to_json_column},
    models::{Event, EventPayload, Viewport},
    Database, StorageFault, StorageResult,
};

/// Splits the payload into its `event` tag and the JSON text of its `data` body.
fn payload_columns(payload: &EventPayload) -> Result<(&'static str, String)> {
    let mut tagged = serde_json::to_value(payload).context("failed to serialize event payload")?;
    let data = tagged
        .get_mut("data")
        .map(Value::take)
        .unwrap_or_else(|| json!({}));
    Ok((payload.kind(), to_json_column(&data, "data_json")?))
}

fn payload_from_columns(kind: &str, data_json: &str) -> Result<EventPayload> {
    let data: Value = from_json_column(data_json, "data_json")?;
    serde_json::from_value(json!({ "event": kind, "data": data }))
        .with_context(|| format!("failed to decode payload for event type '{kind}'"))
}

fn row_to_event(row: &Row) -> Result<Event, rusqlite::Error> {
    let kind: String = row.get("event")?;
    let data_json: String = row.get("data_json")?;
    let viewport_json: Option<String> = row.get("viewport_json")?;

    Ok(Event {
        id: Some(row.get("id")?),
        timestamp: Some(row.get("timestamp")?),
        payload: payload_from_columns(&kind, &data_json).map_err(conversion_error)?,
        url: row.get("url")?,
        title: row.get("title")?,
        scroll_y: row.get("scroll_y")?,
        viewport: from_optional_json_column::<Viewport>(viewport_json, "viewport_json")
            .map_err(conversion_error)?,
        page_fingerprint: row.get("page_fingerprint")?,
    })
}

impl Database {
    /// Appends one event and returns it with its store-assigned id. An id that is
    /// already present on the event is kept; inserting over an existing row fails.
    pub async fn append_event(&self, event: &Event) -> StorageResult<Event> {
        let mut record = event.clone();
        self.execute(move |conn| {
            let timestamp = require(record.timestamp, "timestamp")?;
            let (kind, data_json) = payload_columns(&record.payload)?;
            let viewport_json = record
                .viewport
                .as_ref()
                .map(|viewport| to_json_column(viewport, "viewport_json"))
                .transpose()?;

            conn.execute(
                "INSERT INTO events (
                    id,
                    timestamp,
                    event,
                    url,
                    title,
                    scroll_y,
                    viewport_json,
                    page_fingerprint,
                    data_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    timestamp,
                    kind,
                    record.url,
                    record.title,
                    record.scroll_y,
                    viewport_json,
                    record.page_fingerprint,
                    data_json,
                ],
            )
            .with_context(|| "failed to insert event")?;

            record.id = Some(conn.last_insert_rowid());
            Ok(record)
        })
        .await
        .map_err(StorageFault::Transaction)
    }

    /// Every stored event. No ordering is promised; callers sort by timestamp.
    pub async fn load_all_events(&self) -> StorageResult<Vec<Event>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    timestamp,
                    event,
                    url,
                    title,
                    scroll_y,
                    viewport_json,
                    page_fingerprint,
                    data_json
                FROM events",
            )?;

            let events_iter = stmt.query_map([], |row| row_to_event(row))?;

            let mut events = Vec::new();
            for event_result in events_iter {
                events.push(event_result.map_err(|err| anyhow!(err))?);
            }

            Ok(events)
        })
        .await
        .map_err(StorageFault::Transaction)
    }

    pub async fn count_events(&self) -> StorageResult<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(StorageFault::Transaction)
    }
}
