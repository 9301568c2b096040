use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::capture::sink::CaptureSink;
use crate::db::Event;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordStats {
    pub received: usize,
    pub stored: usize,
    pub rejected: usize,
    /// 1-based input line numbers that did not decode as an event.
    pub undecodable_lines: Vec<usize>,
}

/// Feeds newline-delimited JSON events from `input` (stdin when `None`) into the sink.
pub async fn record(sink: &CaptureSink, input: Option<PathBuf>) -> Result<RecordStats> {
    let stats = match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            ingest_lines(sink, BufReader::new(file)).await?
        }
        None => ingest_lines(sink, BufReader::new(tokio::io::stdin())).await?,
    };

    log_info!(
        "capture finished: {} received, {} stored, {} rejected",
        stats.received,
        stats.stored,
        stats.rejected
    );
    Ok(stats)
}

pub async fn ingest_lines<R>(sink: &CaptureSink, reader: R) -> Result<RecordStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RecordStats::default();
    let mut lines = reader.lines();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await.context("failed to read capture input")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.received += 1;

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                log_warn!("skipping undecodable event on input line {line_number}: {err}");
                stats.rejected += 1;
                stats.undecodable_lines.push(line_number);
                continue;
            }
        };

        if sink.on_event(event).await.is_some() {
            stats.stored += 1;
        } else {
            stats.rejected += 1;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EventBus;
    use crate::db::Database;

    #[tokio::test]
    async fn ingests_valid_lines_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let sink = CaptureSink::new(db.clone(), EventBus::new());

        let input = concat!(
            r#"{"timestamp": 1, "event": "navigation", "url": "https://a.test", "data": {}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"timestamp": 2, "event": "click", "url": "https://a.test", "data": {"element": {"tag": "A"}}}"#,
            "\n",
        );

        let stats = ingest_lines(&sink, BufReader::new(input.as_bytes()))
            .await
            .unwrap();
        assert_eq!(
            stats,
            RecordStats {
                received: 3,
                stored: 2,
                rejected: 1,
                undecodable_lines: vec![2],
            }
        );
        assert_eq!(db.count_events().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejected_lines_are_numbered_as_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let sink = CaptureSink::new(db, EventBus::new());

        let input = concat!(
            "\n",
            "\n",
            r#"{"timestamp": 1, "event": "navigation", "url": "https://a.test"}"#,
            "\n",
            "{broken\n",
        );

        let stats = ingest_lines(&sink, BufReader::new(input.as_bytes()))
            .await
            .unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.undecodable_lines, vec![4]);
    }
}
