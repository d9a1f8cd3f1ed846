//! Reconnect watchdog
//!
//! Armed when the backend connection drops or an operation fails, cleared
//! when it comes back. If the window elapses while armed the watchdog
//! latches into the expired state, which the process treats as fatal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub struct ReconnectWatchdog {
    timeout: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
    expired: Arc<watch::Sender<bool>>,
}

impl ReconnectWatchdog {
    pub fn new(timeout: Duration) -> Self {
        let (expired, _) = watch::channel(false);
        Self {
            timeout,
            timer: Mutex::new(None),
            expired: Arc::new(expired),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts the countdown. While a countdown is running this is a no-op,
    /// so repeated failures never push the deadline back.
    pub fn arm(&self) {
        if self.has_expired() {
            return;
        }
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let expired = Arc::clone(&self.expired);
        let timeout = self.timeout;
        debug!(timeout_ms = timeout.as_millis() as u64, "reconnect watchdog armed");
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            error!(
                timeout_ms = timeout.as_millis() as u64,
                "store did not reconnect within the watchdog window"
            );
            expired.send_replace(true);
        }));
    }

    pub fn clear(&self) {
        if let Some(timer) = self.timer.lock().take() {
            if !timer.is_finished() {
                timer.abort();
                debug!("reconnect watchdog cleared");
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn has_expired(&self) -> bool {
        *self.expired.borrow()
    }

    /// Resolves once the window has elapsed without a reconnect. Never
    /// resolves otherwise.
    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.expired.subscribe();
        async move {
            if rx.wait_for(|expired| *expired).await.is_err() {
                // sender gone: the store was dropped, nothing left to watch
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Drop for ReconnectWatchdog {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_window() {
        let watchdog = ReconnectWatchdog::new(WINDOW);
        watchdog.arm();
        assert!(watchdog.is_armed());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(!watchdog.has_expired());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(watchdog.has_expired());
        watchdog.expired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_before_window_prevents_expiry() {
        let watchdog = ReconnectWatchdog::new(WINDOW);
        watchdog.arm();
        tokio::time::sleep(Duration::from_secs(5)).await;
        watchdog.clear();
        assert!(!watchdog.is_armed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!watchdog.has_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_keeps_first_deadline() {
        let watchdog = ReconnectWatchdog::new(WINDOW);
        watchdog.arm();
        tokio::time::sleep(Duration::from_secs(6)).await;
        watchdog.arm();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(watchdog.has_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_instances_do_not_share_timer() {
        let first = ReconnectWatchdog::new(WINDOW);
        let second = ReconnectWatchdog::new(WINDOW);
        first.arm();
        second.arm();
        second.clear();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(first.has_expired());
        assert!(!second.has_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_future_pending_while_healthy() {
        let watchdog = ReconnectWatchdog::new(WINDOW);
        let result = tokio::time::timeout(Duration::from_secs(60), watchdog.expired()).await;
        assert!(result.is_err());
    }
}
