//! Status Poller
//!
//! Background worker that watches a freshly started tunnel until its first
//! handshake, then reports "connected" once and exits. It never reports a
//! disconnect.

use crate::handshake::HandshakeStatus;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sink for connection status events
pub trait StatusCallback: Send + Sync {
    fn on_status_changed(&self, connected: bool);
}

impl<F> StatusCallback for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_status_changed(&self, connected: bool) {
        self(connected)
    }
}

/// Source of handshake observations
#[async_trait]
pub trait HandshakeSource: Send + Sync {
    async fn last_handshake(&self, name: &str) -> HandshakeStatus;
}

/// Single-worker handshake poller
pub struct StatusPoller {
    source: Arc<dyn HandshakeSource>,
    interval: Duration,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn HandshakeSource>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            cancel: None,
            handle: None,
        }
    }

    /// Start watching `name`, cancelling any previous worker first
    pub fn start(&mut self, name: impl Into<String>, callback: Option<Arc<dyn StatusCallback>>) {
        self.stop();

        let name = name.into();
        let token = CancellationToken::new();
        let source = self.source.clone();
        let interval = self.interval;

        debug!("Starting status poller for {}", name);
        self.handle = Some(tokio::spawn(poll_loop(name, source, callback, interval, token.clone())));
        self.cancel = Some(token);
    }

    /// Cancel the worker; it exits within one poll interval
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.handle = None;
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    name: String,
    source: Arc<dyn HandshakeSource>,
    callback: Option<Arc<dyn StatusCallback>>,
    interval: Duration,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        let status = tokio::select! {
            _ = token.cancelled() => break,
            status = source.last_handshake(&name) => status,
        };

        match status {
            HandshakeStatus::NotActive => {
                debug!("{} is no longer active, poller exiting", name);
                break;
            }
            HandshakeStatus::HandshakeAt(epoch) => {
                info!("{} connected (handshake at {})", name, epoch);
                if let Some(callback) = &callback {
                    callback.on_status_changed(true);
                }
                break;
            }
            other => debug!("{}: {}, retrying", name, other),
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedHandshakes {
        statuses: Mutex<VecDeque<HandshakeStatus>>,
        calls: AtomicUsize,
    }

    impl ScriptedHandshakes {
        fn new(statuses: &[HandshakeStatus]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HandshakeSource for ScriptedHandshakes {
        async fn last_handshake(&self, _name: &str) -> HandshakeStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(HandshakeStatus::NoHandshakeYet)
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, Arc<dyn StatusCallback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        let callback: Arc<dyn StatusCallback> = Arc::new(move |connected: bool| {
            assert!(connected);
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    async fn wait_until_idle(poller: &StatusPoller) {
        for _ in 0..100 {
            if !poller.is_running() {
                return;
            }
            tokio::time::sleep(poller.interval()).await;
        }
        panic!("poller did not finish");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_on_first_handshake() {
        let source = ScriptedHandshakes::new(&[
            HandshakeStatus::NoHandshakeYet,
            HandshakeStatus::NoHandshakeYet,
            HandshakeStatus::QueryFailed,
            HandshakeStatus::HandshakeAt(1_700_000_000),
        ]);
        let (count, callback) = counting_callback();

        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.start("wg0", Some(callback));
        wait_until_idle(&poller).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_silently_when_inactive() {
        let source = ScriptedHandshakes::new(&[HandshakeStatus::NoPeer, HandshakeStatus::NotActive]);
        let (count, callback) = counting_callback();

        let mut poller = StatusPoller::new(source.clone(), Duration::from_millis(500));
        poller.start("wg0", Some(callback));
        wait_until_idle(&poller).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_worker() {
        let source = ScriptedHandshakes::new(&[]);
        let (count, callback) = counting_callback();

        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.start("wg0", Some(callback));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        poller.stop();
        assert!(!poller.is_running());

        let calls = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_worker() {
        let source = ScriptedHandshakes::new(&[]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));

        poller.start("wg0", None);
        poller.start("wg1", None);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        // Only the second worker keeps polling: one call per interval.
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        poller.stop();
    }
}
