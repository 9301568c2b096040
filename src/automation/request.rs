use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::db::models::{Event, EventPayload, NavigationData};
use crate::segmentation::Workflow;

/// One event as the backend's `/api/automate` endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendEvent {
    pub event: String,
    pub timestamp: i64,
    pub url: String,
    pub title: String,
    pub data: Value,
    /// The full captured record, context snapshot included.
    pub raw: Value,
    /// Replay hints: selector, xpath and typed value when known.
    pub automation: Value,
}

impl BackendEvent {
    pub fn from_event(event: &Event) -> Result<Self> {
        let raw = serde_json::to_value(event).context("failed to serialize event")?;
        let data = raw.get("data").cloned().unwrap_or_else(|| json!({}));

        Ok(Self {
            event: event.kind().to_string(),
            timestamp: event.timestamp.unwrap_or_default(),
            url: event.url.clone(),
            title: event.title.clone(),
            data,
            raw,
            automation: automation_hints(&event.payload),
        })
    }
}

fn automation_hints(payload: &EventPayload) -> Value {
    let mut hints = Map::new();
    match payload {
        EventPayload::Click(interaction)
        | EventPayload::Input(interaction)
        | EventPayload::Change(interaction)
        | EventPayload::Submit(interaction)
        | EventPayload::Keydown(interaction) => {
            if let Some(locator) = &interaction.locator {
                if let Some(css) = &locator.css_selector {
                    hints.insert("selector".into(), json!(css));
                }
                if let Some(xpath) = &locator.xpath {
                    hints.insert("xpath".into(), json!(xpath));
                }
            }
            if let Some(value) = &interaction.value {
                hints.insert("value".into(), json!(value));
            }
            hints.insert("target".into(), json!(interaction.target_label()));
        }
        EventPayload::Scroll(scroll) => {
            hints.insert("delta_y".into(), json!(scroll.delta_y));
        }
        EventPayload::Navigation(_) => {}
    }
    Value::Object(hints)
}

#[derive(Debug, Clone, Default)]
pub struct AutomateOptions {
    /// Replaces the workflow's own start URL and is replayed as an initial navigation.
    pub start_url: Option<String>,
    pub headless: bool,
    /// Skips description generation on the backend when present.
    pub task_description: Option<String>,
    pub input_values: BTreeMap<String, String>,
}

/// Body of `POST /api/automate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomateRequest {
    pub workflow_id: String,
    pub events: Vec<BackendEvent>,
    pub start_url: String,
    pub headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_values: Option<BTreeMap<String, String>>,
}

impl AutomateRequest {
    pub fn from_workflow(workflow: &Workflow, options: AutomateOptions) -> Result<Self> {
        let mut events = workflow
            .events
            .iter()
            .map(BackendEvent::from_event)
            .collect::<Result<Vec<_>>>()?;

        let start_url = match &options.start_url {
            Some(url) => {
                let navigation = Event {
                    id: None,
                    timestamp: Some(0),
                    payload: EventPayload::Navigation(NavigationData::default()),
                    url: url.clone(),
                    title: String::new(),
                    scroll_y: 0.0,
                    viewport: None,
                    page_fingerprint: None,
                };
                events.insert(0, BackendEvent::from_event(&navigation)?);
                url.clone()
            }
            None => workflow.start_url().unwrap_or_default().to_string(),
        };

        let task_description = options
            .task_description
            .map(|task| apply_secret_placeholders(&task, options.input_values.keys()));

        Ok(Self {
            workflow_id: workflow.index.to_string(),
            events,
            start_url,
            headless: options.headless,
            task_description,
            input_values: non_empty(options.input_values),
        })
    }
}

/// Body of `POST /api/automate/task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    pub headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_values: Option<BTreeMap<String, String>>,
}

impl TaskRequest {
    pub fn new(task: &str, headless: bool, input_values: BTreeMap<String, String>) -> Self {
        Self {
            task: apply_secret_placeholders(task, input_values.keys()),
            headless,
            input_values: non_empty(input_values),
        }
    }
}

fn non_empty(values: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Rewrites `{{key}}` to `<secret>key</secret>` so the replay agent fills the
/// value in itself and never sees it in the task text.
pub fn apply_secret_placeholders<'a, I>(task: &str, keys: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter().fold(task.to_string(), |text, key| {
        text.replace(&format!("{{{{{key}}}}}"), &format!("<secret>{key}</secret>"))
    })
}

/// Parses `KEY=VALUE` pairs from the command line.
pub fn parse_input_values(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("input value '{pair}' is not KEY=VALUE"))?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
