use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::segmentation::{segment_events, SegmentationConfig, Workflow};

use super::render::{self, DetailOptions};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Where rendered frames go. Each call replaces whatever the previous frame showed.
pub trait Surface: Send + 'static {
    fn draw(&mut self, frame: &str);
}

/// Writes each frame to stdout, separated by a rule.
pub struct TerminalSurface {
    frames_drawn: usize,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self { frames_drawn: 0 }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn draw(&mut self, frame: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        if self.frames_drawn > 0 {
            let _ = writeln!(lock, "{}", "─".repeat(60));
        }
        let _ = write!(lock, "{frame}");
        let _ = lock.flush();
        self.frames_drawn += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Empty,
    List,
    Detail(usize),
    Error(String),
}

struct DashboardState {
    workflows: Vec<Workflow>,
    view: View,
    surface: Box<dyn Surface>,
}

/// Loads events, segments them and renders the result. Clones share state, so
/// the watcher and the CLI can drive the same dashboard.
#[derive(Clone)]
pub struct DashboardPresenter {
    db: Database,
    config: SegmentationConfig,
    state: Arc<Mutex<DashboardState>>,
}

impl DashboardPresenter {
    pub fn new(db: Database, config: SegmentationConfig, surface: Box<dyn Surface>) -> Self {
        Self {
            db,
            config,
            state: Arc::new(Mutex::new(DashboardState {
                workflows: Vec::new(),
                view: View::Empty,
                surface,
            })),
        }
    }

    /// Reloads every event, re-segments and redraws the list. On failure the
    /// list is replaced by an error panel and the error is returned.
    pub async fn refresh(&self) -> Result<usize> {
        self.reload(true).await
    }

    /// Like `refresh`, but keeps the current frame unless loading fails.
    pub async fn refresh_quietly(&self) -> Result<usize> {
        self.reload(false).await
    }

    async fn load(&self) -> Result<Vec<Workflow>> {
        let events = self.db.load_all_events().await?;
        Ok(segment_events(events, &self.config)?)
    }

    /// Holds the state lock across the load so overlapping refreshes draw in the
    /// order they read the store.
    async fn reload(&self, draw_list: bool) -> Result<usize> {
        let mut state = self.state.lock().await;
        let loaded = self.load().await;

        match loaded {
            Ok(workflows) => {
                let count = workflows.len();
                if draw_list {
                    let frame = render::render_list(&workflows);
                    state.surface.draw(&frame);
                    state.view = View::List;
                }
                state.workflows = workflows;
                log_debug!("dashboard refreshed: {count} workflow(s)");
                Ok(count)
            }
            Err(err) => {
                log_error!("dashboard refresh failed: {err:#}");
                let message = format!("{err:#}");
                state.surface.draw(&render::render_error(&message));
                state.view = View::Error(message);
                Err(err)
            }
        }
    }

    /// Renders the detail view of a workflow from the most recent refresh.
    pub async fn select_workflow(&self, index: usize, options: DetailOptions) -> Result<()> {
        let mut state = self.state.lock().await;
        let detail = state
            .workflows
            .get(index)
            .map(|workflow| render::render_detail(workflow, &options));
        let frame = match detail {
            Some(frame) => frame,
            None => {
                let available = state.workflows.len();
                state.surface.draw(&render::render_not_found(index, available));
                return Err(anyhow!(
                    "workflow {index} does not exist ({available} available)"
                ));
            }
        };
        state.surface.draw(&frame);
        state.view = View::Detail(index);
        Ok(())
    }

    pub async fn workflows(&self) -> Vec<Workflow> {
        self.state.lock().await.workflows.clone()
    }

    pub async fn workflow(&self, index: usize) -> Option<Workflow> {
        self.state.lock().await.workflows.get(index).cloned()
    }

    pub async fn view(&self) -> View {
        self.state.lock().await.view.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::{Event, EventPayload, Interaction};
    use std::sync::Mutex as StdMutex;

    /// Records frames for inspection.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSurface {
        pub frames: Arc<StdMutex<Vec<String>>>,
    }

    impl RecordingSurface {
        pub fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl Surface for RecordingSurface {
        fn draw(&mut self, frame: &str) {
            self.frames.lock().unwrap().push(frame.to_string());
        }
    }

    pub(crate) fn click_at(timestamp: i64) -> Event {
        Event {
            id: None,
            timestamp: Some(timestamp),
            payload: EventPayload::Click(Interaction::default()),
            url: "https://a.test".into(),
            title: "A".into(),
            scroll_y: 0.0,
            viewport: None,
            page_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn refresh_segments_stored_events() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        for ts in [400_000, 0, 1_000] {
            db.append_event(&click_at(ts)).await.unwrap();
        }

        let surface = RecordingSurface::default();
        let presenter =
            DashboardPresenter::new(db, SegmentationConfig::default(), Box::new(surface.clone()));

        assert_eq!(presenter.refresh().await.unwrap(), 2);
        assert_eq!(presenter.view().await, View::List);
        let workflows = presenter.workflows().await;
        assert_eq!(workflows[0].event_count(), 2);
        assert_eq!(workflows[1].start_ms, 400_000);
        assert!(surface.frames()[0].starts_with("Workflows (2)"));

        presenter
            .select_workflow(1, DetailOptions::default())
            .await
            .unwrap();
        assert_eq!(presenter.view().await, View::Detail(1));
        assert!(surface.frames()[1].starts_with("Workflow 1"));
    }

    #[tokio::test]
    async fn overlapping_refreshes_end_on_latest_data() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        db.append_event(&click_at(0)).await.unwrap();

        let surface = RecordingSurface::default();
        let presenter = DashboardPresenter::new(
            db.clone(),
            SegmentationConfig::default(),
            Box::new(surface.clone()),
        );

        let first = presenter.clone();
        let second = presenter.clone();
        let (a, b) = tokio::join!(first.refresh(), async move {
            db.append_event(&click_at(900_000)).await.unwrap();
            second.refresh().await
        });
        a.unwrap();
        assert_eq!(b.unwrap(), 2);

        assert_eq!(presenter.workflows().await.len(), 2);
        assert!(surface.frames().last().unwrap().starts_with("Workflows (2)"));
    }

    #[tokio::test]
    async fn unknown_workflow_index_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let surface = RecordingSurface::default();
        let presenter =
            DashboardPresenter::new(db, SegmentationConfig::default(), Box::new(surface.clone()));

        presenter.refresh().await.unwrap();
        assert!(presenter
            .select_workflow(3, DetailOptions::default())
            .await
            .is_err());
        assert_eq!(surface.frames().last().unwrap(), "Workflow 3 not found (0 available)\n");
    }

    #[tokio::test]
    async fn storage_fault_renders_error_panel() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        db.append_event(&click_at(1)).await.unwrap();

        let surface = RecordingSurface::default();
        let presenter = DashboardPresenter::new(
            db.clone(),
            SegmentationConfig::default(),
            Box::new(surface.clone()),
        );
        presenter.refresh().await.unwrap();

        db.execute(|conn| {
            conn.execute_batch("DROP TABLE events")?;
            Ok(())
        })
        .await
        .unwrap();

        assert!(presenter.refresh().await.is_err());
        assert!(matches!(presenter.view().await, View::Error(_)));
        let frames = surface.frames();
        assert!(frames.last().unwrap().starts_with("Could not load workflows"));
    }
}
