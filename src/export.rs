//! Read-only JSON snapshot of the full event set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, Event};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventExport {
    pub exported_at: DateTime<Utc>,
    pub event_count: usize,
    pub events: Vec<Event>,
}

/// Accepted input for offline segmentation: an export document or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportInput {
    Document(EventExport),
    Events(Vec<Event>),
}

pub fn default_file_name(now: DateTime<Utc>) -> String {
    format!("autopattern-events-{}.json", now.format("%Y%m%d-%H%M%S"))
}

/// Writes every stored event, sorted by timestamp, to `output` (or a timestamped
/// file in the current directory). Returns the path written.
pub async fn export_events(db: &Database, output: Option<PathBuf>) -> Result<PathBuf> {
    let mut events = db.load_all_events().await?;
    events.sort_by_key(|event| (event.timestamp, event.id));

    let now = Utc::now();
    let document = EventExport {
        exported_at: now,
        event_count: events.len(),
        events,
    };

    let path = output.unwrap_or_else(|| PathBuf::from(default_file_name(now)));
    let serialized =
        serde_json::to_string_pretty(&document).context("failed to serialize event export")?;
    tokio::fs::write(&path, serialized)
        .await
        .with_context(|| format!("failed to write export to {}", path.display()))?;

    log::info!("Exported {} event(s) to {}", document.event_count, path.display());
    Ok(path)
}

pub async fn load_export(path: &Path) -> Result<Vec<Event>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input: ExportInput = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not an event export", path.display()))?;
    Ok(match input {
        ExportInput::Document(document) => document.events,
        ExportInput::Events(events) => events,
    })
}
