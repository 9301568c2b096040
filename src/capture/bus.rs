use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 64;

/// Messages consumed by open dashboards. Serialized as `{"action": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DashboardMessage {
    RefreshDashboard,
}

/// Broadcast channel between the capture sink and any number of presenters.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Fire-and-forget: returns how many listeners were reached, zero when none
    /// are subscribed.
    pub fn broadcast(&self, message: DashboardMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardMessage> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
