use anyhow::Result;

use crate::capture::{commands::record, CaptureSink, EventBus};
use crate::db::Database;
use crate::segmentation::SegmentationConfig;
use crate::settings::WorkflowSettings;

use super::presenter::{DashboardPresenter, TerminalSurface};
use super::render::DetailOptions;
use super::watcher::DashboardWatcher;

fn terminal_presenter(db: &Database, config: SegmentationConfig) -> DashboardPresenter {
    DashboardPresenter::new(db.clone(), config, Box::new(TerminalSurface::new()))
}

pub async fn list_workflows(db: &Database, config: SegmentationConfig) -> Result<()> {
    terminal_presenter(db, config).refresh().await.map(|_| ())
}

pub async fn show_workflow(
    db: &Database,
    config: SegmentationConfig,
    index: usize,
    options: DetailOptions,
) -> Result<()> {
    let presenter = terminal_presenter(db, config);
    presenter.refresh_quietly().await?;
    presenter.select_workflow(index, options).await
}

/// Records NDJSON events from `input` while a live dashboard redraws on stdout.
pub async fn record_with_dashboard(
    db: &Database,
    settings: &WorkflowSettings,
    input: Option<std::path::PathBuf>,
) -> Result<()> {
    let bus = EventBus::new();
    let presenter = terminal_presenter(db, settings.segmentation());

    // Initial render before anything new arrives.
    let _ = presenter.refresh().await;

    let mut watcher = DashboardWatcher::new();
    watcher.start(presenter, &bus, settings.debounce())?;

    let sink = CaptureSink::new(db.clone(), bus);
    let result = record(&sink, input).await;

    drop(sink);
    watcher.join().await?;
    result.map(|_| ())
}
