use serde::Serialize;

use crate::db::models::{Event, EventPayload};
use crate::segmentation::{config::SegmentationConfig, error::SegmentationInputFault};

/// A run of chronologically adjacent events with no inactivity gap above the
/// threshold. Derived on every load, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    /// Ordinal position in the computation that produced it.
    pub index: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    pub events: Vec<Event>,
}

impl Workflow {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// URL of the first navigation, falling back to the page of the first event.
    pub fn start_url(&self) -> Option<&str> {
        self.events
            .iter()
            .find(|event| matches!(event.payload, EventPayload::Navigation(_)))
            .or_else(|| self.events.first())
            .map(|event| event.url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Distinct page URLs in first-seen order.
    pub fn distinct_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for event in &self.events {
            if !event.url.is_empty() && !urls.contains(&event.url.as_str()) {
                urls.push(event.url.as_str());
            }
        }
        urls
    }

    /// One numbered line per event, in order.
    pub fn summary(&self) -> String {
        self.events
            .iter()
            .enumerate()
            .map(|(i, event)| format!("{}. {}", i + 1, event.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sorts events by timestamp (stable, so ties keep their input order) and splits
/// them wherever two neighbours are more than the inactivity threshold apart.
pub fn segment_events(
    events: Vec<Event>,
    config: &SegmentationConfig,
) -> Result<Vec<Workflow>, SegmentationInputFault> {
    let mut timed = Vec::with_capacity(events.len());
    for (position, event) in events.into_iter().enumerate() {
        let timestamp = event
            .timestamp
            .ok_or(SegmentationInputFault::MissingTimestamp { position })?;
        timed.push((timestamp, event));
    }
    timed.sort_by_key(|(timestamp, _)| *timestamp);

    let mut workflows: Vec<Workflow> = Vec::new();
    let mut current: Option<Workflow> = None;

    for (timestamp, event) in timed {
        match &mut current {
            Some(workflow) if !exceeds_threshold(workflow.end_ms, timestamp, config) => {
                workflow.end_ms = timestamp;
                workflow.events.push(event);
            }
            _ => {
                if let Some(workflow) = current.take() {
                    workflows.push(workflow);
                }
                current = Some(Workflow {
                    index: workflows.len(),
                    start_ms: timestamp,
                    end_ms: timestamp,
                    events: vec![event],
                });
            }
        }
    }

    if let Some(workflow) = current {
        workflows.push(workflow);
    }

    Ok(workflows)
}

fn exceeds_threshold(previous_ms: i64, next_ms: i64, config: &SegmentationConfig) -> bool {
    let gap = i128::from(next_ms) - i128::from(previous_ms);
    gap > i128::from(config.inactivity_threshold_ms)
}
