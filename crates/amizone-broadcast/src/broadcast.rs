use std::sync::Arc;
use std::time::Duration;

use amizone_core::config::RealtimeConfig;
use amizone_realtime::{BroadcastMessage, Channel};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{keys::KeySource, progress::Progress};

/// Keypress → broadcast loop over one subscribed channel.
///
/// The loop owns the channel and the counter; nothing else touches them.
/// Each iteration makes one non-blocking input check, sends at most one
/// broadcast, then sleeps for the poll interval. Sends go out only while
/// the channel reports `subscribed`; earlier keys are dropped with a
/// warning and do not advance the counter.
pub struct BroadcastLoop<C, K> {
    channel: C,
    keys: K,
    event: String,
    greeting: String,
    interval: Duration,
    counter: u64,
    progress: Arc<dyn Progress>,
}

impl<C: Channel, K: KeySource> BroadcastLoop<C, K> {
    pub fn new(channel: C, keys: K, settings: &RealtimeConfig, progress: Arc<dyn Progress>) -> Self {
        Self {
            channel,
            keys,
            event: settings.event.clone(),
            greeting: settings.greeting.clone(),
            interval: Duration::from_millis(settings.poll_interval_ms),
            counter: 0,
            progress,
        }
    }

    /// Number of broadcasts dispatched so far; also the last `no` sent.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Run until `shutdown` becomes `true` (or its sender is dropped).
    ///
    /// Hands the channel back so the caller can leave the topic.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> C {
        self.progress.step("5", "press 'b' for broadcast");
        info!(topic = %self.channel.topic(), interval_ms = self.interval.as_millis() as u64, "broadcast loop started");

        loop {
            self.poll_once().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!(sent = self.counter, "broadcast loop stopped");
        self.channel
    }

    /// One iteration without the trailing sleep.
    ///
    /// Returns the counter value sent, if a broadcast went out.
    pub async fn poll_once(&mut self) -> Option<u64> {
        let raw = self.keys.try_next()?;
        let key = raw.trim();
        if key.is_empty() {
            return None;
        }

        let state = self.channel.state();
        if !state.is_subscribed() {
            warn!(%state, key, "channel not subscribed, key dropped");
            self.progress
                .step("!", &format!("channel {state}, key '{key}' not sent"));
            return None;
        }

        self.counter += 1;
        let no = self.counter;
        self.progress.step("6", &format!("send broadcast for no={no}"));

        let message = BroadcastMessage::keypress(&self.event, &self.greeting, key, no);
        match self.channel.send_broadcast(&message).await {
            Ok(()) => {
                debug!(no, key, "broadcast queued");
                Some(no)
            }
            Err(e) => {
                warn!(no, error = %e, "send broadcast failed");
                self.progress
                    .step("!", &format!("send broadcast for no={no} failed: {e}"));
                None
            }
        }
    }
}
