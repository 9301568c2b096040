//! Plain-text rendering of the workflow list, the workflow detail view and the
//! error panel. Every function returns the whole frame; drawing it is the
//! surface's job.

use std::fmt::Write as _;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::db::models::{
    DomLocator, ElementSnapshot, Event, EventPayload, Interaction, NavigationData, ScrollData,
};
use crate::segmentation::Workflow;

/// Which payload sections of the detail view are disclosed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailOptions {
    pub expand_payload: bool,
}

impl DetailOptions {
    pub fn expanded() -> Self {
        Self {
            expand_payload: true,
        }
    }
}

fn format_time(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(utc) => DateTime::<Local>::from(utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => format!("@{timestamp_ms}ms"),
    }
}

fn format_duration(duration_ms: i64) -> String {
    let secs = duration_ms.max(0) / 1000;
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, _) => format!("{h}h {m:02}m"),
    }
}

pub fn render_list(workflows: &[Workflow]) -> String {
    if workflows.is_empty() {
        return "No workflows recorded yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Workflows ({})", workflows.len());
    for workflow in workflows {
        let _ = writeln!(
            out,
            "  [{}] {}  {:>3} event(s)  {:>8}  {}",
            workflow.index,
            format_time(workflow.start_ms),
            workflow.event_count(),
            format_duration(workflow.duration_ms()),
            workflow.start_url().unwrap_or("-"),
        );
    }
    out
}

pub fn render_error(message: &str) -> String {
    format!("Could not load workflows\n  {message}\n")
}

pub fn render_not_found(index: usize, available: usize) -> String {
    format!("Workflow {index} not found ({available} available)\n")
}

pub fn render_detail(workflow: &Workflow, options: &DetailOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Workflow {}  {} -> {}  ({}, {} event(s))",
        workflow.index,
        format_time(workflow.start_ms),
        format_time(workflow.end_ms),
        format_duration(workflow.duration_ms()),
        workflow.event_count(),
    );

    let urls = workflow.distinct_urls();
    if !urls.is_empty() {
        let _ = writeln!(out, "  pages: {}", urls.join(", "));
    }

    for (position, event) in workflow.events.iter().enumerate() {
        let _ = writeln!(out);
        render_event(&mut out, position + 1, event, options);
    }
    out
}

fn render_event(out: &mut String, position: usize, event: &Event, options: &DetailOptions) {
    let _ = writeln!(
        out,
        "{position:>3}. {}  {}",
        event.timestamp.map(format_time).unwrap_or_else(|| "-".into()),
        event.describe(),
    );
    let _ = writeln!(out, "     page: {}", display_or_dash(&event.title));
    let _ = writeln!(out, "     url: {}", display_or_dash(&event.url));
    let mut context = format!("     scrollY: {:.0}", event.scroll_y);
    if let Some(viewport) = &event.viewport {
        let _ = write!(context, "  viewport: {}x{}", viewport.width, viewport.height);
    }
    if let Some(fingerprint) = &event.page_fingerprint {
        let _ = write!(context, "  fingerprint: {fingerprint}");
    }
    let _ = writeln!(out, "{context}");

    for (title, fields) in payload_sections(&event.payload) {
        render_section(out, title, &fields, options);
    }
}

fn render_section(out: &mut String, title: &str, fields: &[(&str, String)], options: &DetailOptions) {
    if fields.is_empty() {
        return;
    }
    if !options.expand_payload {
        let _ = writeln!(out, "     ▸ {title} ({} field(s))", fields.len());
        return;
    }
    let _ = writeln!(out, "     ▾ {title}");
    for (name, value) in fields {
        let _ = writeln!(out, "         {name}: {value}");
    }
}

type Section = (&'static str, Vec<(&'static str, String)>);

fn payload_sections(payload: &EventPayload) -> Vec<Section> {
    match payload {
        EventPayload::Click(interaction)
        | EventPayload::Input(interaction)
        | EventPayload::Change(interaction)
        | EventPayload::Submit(interaction)
        | EventPayload::Keydown(interaction) => interaction_sections(interaction),
        EventPayload::Scroll(scroll) => vec![("Scroll", scroll_fields(scroll))],
        EventPayload::Navigation(nav) => vec![("Navigation", navigation_fields(nav))],
    }
}

fn interaction_sections(interaction: &Interaction) -> Vec<Section> {
    let mut sections = Vec::new();
    if let Some(element) = &interaction.element {
        let mut fields = element_fields(element);
        if let Some(value) = &interaction.value {
            fields.push(("value", value.clone()));
        }
        sections.push(("Interaction", fields));
    } else if let Some(value) = &interaction.value {
        sections.push(("Interaction", vec![("value", value.clone())]));
    }
    if let Some(locator) = &interaction.locator {
        sections.push(("DOM locator", locator_fields(locator)));
    }
    sections
}

fn element_fields(element: &ElementSnapshot) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if !element.tag.is_empty() {
        fields.push(("tag", element.tag.clone()));
    }
    if let Some(kind) = &element.element_type {
        fields.push(("type", kind.clone()));
    }
    if let Some(role) = &element.role {
        fields.push(("role", role.clone()));
    }
    if let Some(text) = &element.text {
        fields.push(("text", text.clone()));
    }
    if let (Some(x), Some(y)) = (element.x, element.y) {
        fields.push(("position", format!("({x:.0}, {y:.0})")));
    }
    if let Some(rect) = &element.bounding_box {
        fields.push((
            "bounding box",
            format!("{:.0}x{:.0} at ({:.0}, {:.0})", rect.width, rect.height, rect.x, rect.y),
        ));
    }
    fields
}

fn locator_fields(locator: &DomLocator) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(css) = &locator.css_selector {
        fields.push(("css", css.clone()));
    }
    if let Some(xpath) = &locator.xpath {
        fields.push(("xpath", xpath.clone()));
    }
    if !locator.ancestors.is_empty() {
        fields.push(("ancestors", locator.ancestors.join(" < ")));
    }
    fields
}

fn scroll_fields(scroll: &ScrollData) -> Vec<(&'static str, String)> {
    vec![("delta", format!("{:+.0}px", scroll.delta_y))]
}

fn navigation_fields(nav: &NavigationData) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(from) = &nav.from_url {
        fields.push(("from", from.clone()));
    }
    if let Some(transition) = &nav.transition {
        fields.push(("transition", transition.clone()));
    }
    fields
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BoundingBox;
    use crate::segmentation::{segment_events, SegmentationConfig};

    fn login_workflow() -> Workflow {
        let click = Event {
            id: Some(1),
            timestamp: Some(1_000),
            payload: EventPayload::Click(Interaction {
                element: Some(ElementSnapshot {
                    tag: "BUTTON".into(),
                    role: Some("button".into()),
                    text: Some("Sign in".into()),
                    bounding_box: Some(BoundingBox {
                        x: 10.0,
                        y: 20.0,
                        width: 80.0,
                        height: 24.0,
                    }),
                    ..ElementSnapshot::default()
                }),
                locator: Some(DomLocator {
                    css_selector: Some("#login button".into()),
                    xpath: None,
                    ancestors: vec!["form#login".into(), "main".into()],
                }),
                value: None,
            }),
            url: "https://a.test/login".into(),
            title: "Login".into(),
            scroll_y: 0.0,
            viewport: None,
            page_fingerprint: None,
        };
        let nav = Event {
            id: Some(2),
            timestamp: Some(0),
            payload: EventPayload::Navigation(NavigationData {
                from_url: None,
                transition: Some("typed".into()),
            }),
            url: "https://a.test/login".into(),
            title: "Login".into(),
            scroll_y: 0.0,
            viewport: None,
            page_fingerprint: None,
        };
        segment_events(vec![click, nav], &SegmentationConfig::default())
            .unwrap()
            .remove(0)
    }

    #[test]
    fn list_shows_one_line_per_workflow() {
        let frame = render_list(&[login_workflow()]);
        assert!(frame.starts_with("Workflows (1)"));
        assert!(frame.contains("[0]"));
        assert!(frame.contains("2 event(s)"));
        assert!(frame.contains("https://a.test/login"));
    }

    #[test]
    fn empty_list_has_placeholder() {
        assert_eq!(render_list(&[]), "No workflows recorded yet.\n");
    }

    #[test]
    fn detail_is_chronological_and_collapsed_by_default() {
        let frame = render_detail(&login_workflow(), &DetailOptions::default());
        let nav_at = frame.find("navigation (typed)").unwrap();
        let click_at = frame.find("click \"Sign in\" (button)").unwrap();
        assert!(nav_at < click_at);
        assert!(frame.contains("▸ Interaction (4 field(s))"));
        assert!(frame.contains("▸ DOM locator (2 field(s))"));
        assert!(!frame.contains("xpath"));
    }

    #[test]
    fn expanded_detail_discloses_fields() {
        let frame = render_detail(&login_workflow(), &DetailOptions::expanded());
        assert!(frame.contains("▾ DOM locator"));
        assert!(frame.contains("ancestors: form#login < main"));
        assert!(frame.contains("bounding box: 80x24 at (10, 20)"));
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(4_200), "4s");
        assert_eq!(format_duration(125_000), "2m 05s");
        assert_eq!(format_duration(3_720_000), "1h 02m");
    }
}
