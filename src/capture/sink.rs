use chrono::Utc;

use crate::capture::bus::{DashboardMessage, EventBus};
use crate::db::{Database, Event};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Single writer of the event store. Each captured event is appended and, on
/// success, announced to listening dashboards.
#[derive(Clone)]
pub struct CaptureSink {
    db: Database,
    bus: EventBus,
}

impl CaptureSink {
    pub fn new(db: Database, bus: EventBus) -> Self {
        Self { db, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Best effort: a storage fault is logged and the event dropped, with no
    /// notification and no retry.
    pub async fn on_event(&self, mut event: Event) -> Option<Event> {
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now().timestamp_millis());
        }

        match self.db.append_event(&event).await {
            Ok(stored) => {
                let reached = self.bus.broadcast(DashboardMessage::RefreshDashboard);
                log_debug!(
                    "captured {} event {:?} at {:?} ({} listener(s) notified)",
                    stored.kind(),
                    stored.id,
                    stored.timestamp,
                    reached
                );
                Some(stored)
            }
            Err(err) => {
                log_error!("dropping captured {} event: {err}", event.kind());
                None
            }
        }
    }
}
