use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coalesces bursts of triggers into one delayed action. Each `schedule` call
/// cancels the pending action (if it has not started yet) and re-arms the timer.
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

struct Pending {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F, Fut>(&mut self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => action().await,
            }
        });

        self.pending = Some(Pending {
            cancel_token,
            handle,
        });
    }

    /// Supersedes the pending action. An action already running is left alone.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel_token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|pending| !pending.handle.is_finished())
            .unwrap_or(false)
    }

    /// Waits for the last scheduled action to fire (or be cancelled).
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Err(err) = pending.handle.await {
                log::error!("debounced task failed to join: {err}");
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
