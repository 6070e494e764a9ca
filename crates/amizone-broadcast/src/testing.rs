//! In-memory stand-ins for the console, stdin and the realtime endpoint.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use amizone_realtime::{
    BroadcastHandler, BroadcastMessage, Channel, RealtimeError, SubscribeHandler,
    SubscriptionState, Transport,
};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::keys::KeySource;
use crate::progress::Progress;

#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for RecordingProgress {
    fn emit(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Replays a fixed script of input checks, then requests shutdown.
pub struct ScriptedKeys {
    script: VecDeque<Option<String>>,
    checks: Arc<Mutex<Vec<Instant>>>,
    shutdown: watch::Sender<bool>,
}

impl ScriptedKeys {
    pub fn new(script: &[Option<&str>]) -> (Self, watch::Receiver<bool>) {
        let (shutdown, rx) = watch::channel(false);
        let keys = Self {
            script: script.iter().map(|k| k.map(String::from)).collect(),
            checks: Arc::new(Mutex::new(Vec::new())),
            shutdown,
        };
        (keys, rx)
    }

    /// Timestamps of every `try_next` call, shared with the test.
    pub fn checks(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.checks)
    }
}

impl KeySource for ScriptedKeys {
    fn try_next(&mut self) -> Option<String> {
        self.checks.lock().unwrap().push(Instant::now());
        let next = self.script.pop_front().flatten();
        if self.script.is_empty() {
            let _ = self.shutdown.send(true);
        }
        next
    }
}

/// Records broadcasts; state and send failures are scripted.
pub struct MockChannel {
    pub state: SubscriptionState,
    /// 1-based send attempts that fail.
    pub failing_attempts: Vec<usize>,
    /// `subscribe` returns an error instead of joining.
    pub fail_subscribe: bool,
    pub attempts: Mutex<usize>,
    pub sent_log: Arc<Mutex<Vec<BroadcastMessage>>>,
}

impl MockChannel {
    pub fn subscribed() -> Self {
        Self::with_state(SubscriptionState::Subscribed)
    }

    pub fn with_state(state: SubscriptionState) -> Self {
        Self {
            state,
            failing_attempts: Vec::new(),
            fail_subscribe: false,
            attempts: Mutex::new(0),
            sent_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent(&self) -> Vec<BroadcastMessage> {
        self.sent_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn topic(&self) -> &str {
        "realtime:ami_zone_channel"
    }

    fn state(&self) -> SubscriptionState {
        self.state
    }

    async fn subscribe(
        &mut self,
        _event: &str,
        _on_broadcast: Arc<dyn BroadcastHandler>,
        on_subscribe: Arc<dyn SubscribeHandler>,
    ) -> Result<(), RealtimeError> {
        if self.fail_subscribe {
            return Err(RealtimeError::NotConnected);
        }
        self.state = SubscriptionState::Subscribed;
        on_subscribe.on_subscribe(SubscriptionState::Subscribed, None);
        Ok(())
    }

    async fn send_broadcast(&self, message: &BroadcastMessage) -> Result<(), RealtimeError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.failing_attempts.contains(&attempt) {
            return Err(RealtimeError::SendFailed("socket writer closed".into()));
        }
        self.sent_log.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn unsubscribe(&mut self) -> Result<(), RealtimeError> {
        self.state = SubscriptionState::Failed;
        Ok(())
    }
}

/// Which setup step should fail.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Connect,
    Channel,
    Subscribe,
}

pub struct MockTransport {
    pub fail_at: FailAt,
    pub sent_log: Arc<Mutex<Vec<BroadcastMessage>>>,
}

impl MockTransport {
    pub fn new(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            sent_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Channel = MockChannel;

    fn endpoint(&self) -> String {
        "wss://mock/realtime/v1".to_string()
    }

    async fn connect(&mut self) -> Result<(), RealtimeError> {
        if self.fail_at == FailAt::Connect {
            return Err(RealtimeError::ConnectionFailed("refused".into()));
        }
        Ok(())
    }

    async fn channel(&self, _topic: &str) -> Result<MockChannel, RealtimeError> {
        if self.fail_at == FailAt::Channel {
            return Err(RealtimeError::NotConnected);
        }
        let mut channel = MockChannel::with_state(SubscriptionState::Pending);
        channel.sent_log = Arc::clone(&self.sent_log);
        channel.fail_subscribe = self.fail_at == FailAt::Subscribe;
        Ok(channel)
    }
}
