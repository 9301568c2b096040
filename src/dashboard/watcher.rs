use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{DashboardMessage, EventBus};

use super::debounce::Debouncer;
use super::presenter::DashboardPresenter;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Keeps a presenter in sync with the capture bus: every notification re-arms a
/// debounced refresh, so a burst of captures costs one reload.
pub struct DashboardWatcher {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DashboardWatcher {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        presenter: DashboardPresenter,
        bus: &EventBus,
        debounce: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("dashboard watcher already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(watch_loop(
            presenter,
            bus.subscribe(),
            debounce,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Stops listening immediately; a pending refresh is dropped.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Waits for the loop to end on its own, which happens once every bus sender
    /// is gone. A refresh still pending at that point is allowed to run.
    pub async fn join(&mut self) -> Result<()> {
        self.cancel_token = None;
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("dashboard watcher task failed to join")
        } else {
            Ok(())
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for DashboardWatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn watch_loop(
    presenter: DashboardPresenter,
    mut receiver: broadcast::Receiver<DashboardMessage>,
    debounce: Duration,
    cancel_token: CancellationToken,
) {
    let mut debouncer = Debouncer::new(debounce);

    loop {
        tokio::select! {
            message = receiver.recv() => match message {
                Ok(DashboardMessage::RefreshDashboard) => schedule_refresh(&mut debouncer, &presenter),
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!("dashboard watcher lagged behind by {skipped} notification(s)");
                    schedule_refresh(&mut debouncer, &presenter);
                }
                Err(RecvError::Closed) => {
                    log_debug!("capture bus closed, flushing pending refresh");
                    debouncer.flush().await;
                    break;
                }
            },
            _ = cancel_token.cancelled() => {
                debouncer.cancel();
                log_info!("dashboard watcher shutting down");
                break;
            }
        }
    }
}

fn schedule_refresh(debouncer: &mut Debouncer, presenter: &DashboardPresenter) {
    let presenter = presenter.clone();
    debouncer.schedule(move || async move {
        // Failures are already rendered as an error panel by the presenter.
        let _ = presenter.refresh().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSink;
    use crate::dashboard::presenter::tests::{click_at, RecordingSurface};
    use crate::db::Database;
    use crate::segmentation::SegmentationConfig;

    #[tokio::test]
    async fn burst_of_captures_triggers_single_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let bus = EventBus::new();
        let sink = CaptureSink::new(db.clone(), bus.clone());

        let surface = RecordingSurface::default();
        let presenter =
            DashboardPresenter::new(db, SegmentationConfig::default(), Box::new(surface.clone()));

        let mut watcher = DashboardWatcher::new();
        watcher
            .start(presenter.clone(), &bus, Duration::from_millis(500))
            .unwrap();
        assert!(watcher.is_running());

        for ts in 0..5 {
            sink.on_event(click_at(ts * 1_000)).await.unwrap();
        }

        // Closing every sender ends the loop after the pending refresh ran.
        drop(sink);
        drop(bus);
        watcher.join().await.unwrap();

        let frames = surface.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("5 event(s)"));
        assert_eq!(presenter.workflows().await.len(), 1);
    }

    #[tokio::test]
    async fn lagged_listener_still_refreshes_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        db.append_event(&click_at(0)).await.unwrap();
        let bus = EventBus::new();

        let surface = RecordingSurface::default();
        let presenter =
            DashboardPresenter::new(db, SegmentationConfig::default(), Box::new(surface.clone()));

        let mut watcher = DashboardWatcher::new();
        watcher
            .start(presenter, &bus, Duration::from_millis(500))
            .unwrap();

        // The loop has not been polled yet, so it falls behind the bus capacity.
        for _ in 0..200 {
            bus.broadcast(DashboardMessage::RefreshDashboard);
        }

        drop(bus);
        watcher.join().await.unwrap();

        let frames = surface.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("1 event(s)"));
    }

    #[tokio::test]
    async fn stop_drops_pending_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let bus = EventBus::new();

        let surface = RecordingSurface::default();
        let presenter =
            DashboardPresenter::new(db, SegmentationConfig::default(), Box::new(surface.clone()));

        let mut watcher = DashboardWatcher::new();
        watcher
            .start(presenter, &bus, Duration::from_secs(60))
            .unwrap();
        bus.broadcast(DashboardMessage::RefreshDashboard);
        tokio::task::yield_now().await;

        watcher.stop().await.unwrap();
        assert!(!watcher.is_running());
        assert!(surface.frames().is_empty());
    }
}
