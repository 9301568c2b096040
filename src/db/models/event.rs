//! Captured browser event data models.
//!
//! An `Event` is one interaction or navigation instant recorded by the extension.
//! The `event` discriminant and its `data` payload travel together as an
//! adjacently tagged union, so every payload shape is known at compile time.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One immutable captured interaction or navigation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the store on insert when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "scrollY", default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub page_fingerprint: Option<String>,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Short human-readable description, e.g. `click "Sign in" (button) on https://...`.
    pub fn describe(&self) -> String {
        let target = match &self.payload {
            EventPayload::Click(interaction)
            | EventPayload::Submit(interaction)
            | EventPayload::Change(interaction) => interaction.target_label(),
            EventPayload::Input(interaction) => match &interaction.value {
                Some(value) => format!("{} = \"{value}\"", interaction.target_label()),
                None => interaction.target_label(),
            },
            EventPayload::Keydown(interaction) => match &interaction.value {
                Some(key) => format!("key {key} in {}", interaction.target_label()),
                None => interaction.target_label(),
            },
            EventPayload::Scroll(scroll) => format!("by {:+.0}px", scroll.delta_y),
            EventPayload::Navigation(nav) => match &nav.transition {
                Some(transition) => format!("({transition})"),
                None => String::new(),
            },
        };

        let mut line = self.kind().to_string();
        if !target.is_empty() {
            line.push(' ');
            line.push_str(&target);
        }
        if !self.url.is_empty() {
            line.push_str(if matches!(self.payload, EventPayload::Navigation(_)) {
                " to "
            } else {
                " on "
            });
            line.push_str(&self.url);
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Serialized adjacently tagged. Decoding treats an absent or null `data` as the
/// variant's empty payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    Click(Interaction),
    Input(Interaction),
    Change(Interaction),
    Submit(Interaction),
    Keydown(Interaction),
    Scroll(ScrollData),
    Navigation(NavigationData),
}

impl EventPayload {
    /// The `event` tag as it appears in JSON and in the `events.event` column.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Click(_) => "click",
            EventPayload::Input(_) => "input",
            EventPayload::Change(_) => "change",
            EventPayload::Submit(_) => "submit",
            EventPayload::Keydown(_) => "keydown",
            EventPayload::Scroll(_) => "scroll",
            EventPayload::Navigation(_) => "navigation",
        }
    }
}

const EVENT_KINDS: &[&str] = &[
    "click",
    "input",
    "change",
    "submit",
    "keydown",
    "scroll",
    "navigation",
];

impl<'de> Deserialize<'de> for EventPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Tagged {
            event: String,
            #[serde(default)]
            data: Value,
        }

        fn body<T>(data: Value) -> serde_json::Result<T>
        where
            T: de::DeserializeOwned + Default,
        {
            match data {
                Value::Null => Ok(T::default()),
                data => serde_json::from_value(data),
            }
        }

        let Tagged { event, data } = Tagged::deserialize(deserializer)?;
        let payload = match event.as_str() {
            "click" => body(data).map(EventPayload::Click),
            "input" => body(data).map(EventPayload::Input),
            "change" => body(data).map(EventPayload::Change),
            "submit" => body(data).map(EventPayload::Submit),
            "keydown" => body(data).map(EventPayload::Keydown),
            "scroll" => body(data).map(EventPayload::Scroll),
            "navigation" => body(data).map(EventPayload::Navigation),
            other => return Err(de::Error::unknown_variant(other, EVENT_KINDS)),
        };
        payload.map_err(de::Error::custom)
    }
}

/// Payload of element-level interactions (click, input, change, submit, keydown).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<DomLocator>,
    /// Typed value for input/change, pressed key for keydown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Interaction {
    /// Best available name for the target element: visible text, then ARIA role or
    /// tag, then the CSS selector.
    pub fn target_label(&self) -> String {
        let element = self.element.as_ref();
        let text = element
            .and_then(|el| el.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty());
        let kind = element.and_then(|el| {
            el.role
                .as_deref()
                .or(el.element_type.as_deref())
                .or(Some(el.tag.as_str()).filter(|tag| !tag.is_empty()))
        });

        match (text, kind) {
            (Some(text), Some(kind)) => format!("\"{text}\" ({})", kind.to_lowercase()),
            (Some(text), None) => format!("\"{text}\""),
            (None, Some(kind)) => kind.to_lowercase(),
            (None, None) => self
                .locator
                .as_ref()
                .and_then(|locator| locator.css_selector.clone().or(locator.xpath.clone()))
                .unwrap_or_else(|| "element".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default)]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomLocator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    /// Outermost-last list of ancestor descriptors, e.g. `form#login`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollData {
    #[serde(default)]
    pub delta_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_url: Option<String>,
    /// Chrome transition type (`link`, `typed`, `reload`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_extension_click() {
        let raw = json!({
            "timestamp": 1_700_000_000_000i64,
            "event": "click",
            "url": "https://example.com/login",
            "title": "Login",
            "scrollY": 120,
            "viewport": { "width": 1280, "height": 800 },
            "page_fingerprint": "abc123",
            "data": {
                "element": { "tag": "BUTTON", "role": "button", "text": "Sign in", "x": 10.0, "y": 20.0 },
                "locator": { "css_selector": "form#login > button", "ancestors": ["form#login"] }
            }
        });

        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.id, None);
        assert_eq!(event.kind(), "click");
        assert_eq!(event.scroll_y, 120.0);
        match &event.payload {
            EventPayload::Click(interaction) => {
                let element = interaction.element.as_ref().unwrap();
                assert_eq!(element.text.as_deref(), Some("Sign in"));
                let locator = interaction.locator.as_ref().unwrap();
                assert_eq!(locator.ancestors, vec!["form#login".to_string()]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn missing_timestamp_is_accepted_at_decode_time() {
        let raw = json!({ "event": "navigation", "url": "https://example.com", "data": {} });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.timestamp, None);
        assert_eq!(event.kind(), "navigation");
    }

    #[test]
    fn describe_names_target_and_page() {
        let raw = json!({
            "timestamp": 1,
            "event": "input",
            "url": "https://example.com/search",
            "data": {
                "element": { "tag": "INPUT", "element_type": "search" },
                "value": "rust"
            }
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event.describe(),
            "input search = \"rust\" on https://example.com/search"
        );

        let nav: Event = serde_json::from_value(json!({
            "timestamp": 2,
            "event": "navigation",
            "url": "https://example.com/",
            "data": { "transition": "typed" }
        }))
        .unwrap();
        assert_eq!(nav.describe(), "navigation (typed) to https://example.com/");
    }

    #[test]
    fn absent_data_decodes_as_empty_payload() {
        let nav: Event = serde_json::from_str(
            r#"{"timestamp":1,"event":"navigation","url":"https://a.test"}"#,
        )
        .unwrap();
        assert_eq!(nav.payload, EventPayload::Navigation(NavigationData::default()));
        assert_eq!(nav.url, "https://a.test");

        let click: Event =
            serde_json::from_value(json!({ "timestamp": 2, "event": "click", "data": null }))
                .unwrap();
        assert_eq!(click.payload, EventPayload::Click(Interaction::default()));
    }

    #[test]
    fn mistyped_data_is_still_rejected() {
        let raw = json!({ "timestamp": 1, "event": "scroll", "data": { "delta_y": "far" } });
        assert!(serde_json::from_value::<Event>(raw).is_err());
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let raw = json!({ "timestamp": 1, "event": "telepathy", "data": {} });
        assert!(serde_json::from_value::<Event>(raw).is_err());
    }
}
