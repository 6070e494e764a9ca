use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use amizone_core::config::{RealtimeConfig, SupabaseCredentials};
use async_trait::async_trait;
use supabase_realtime_rs::{
    self as supabase, ChannelEvent, EventPayload, RealtimeChannelOptions, RealtimeClientOptions,
    SystemEvent,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    channel::{Channel, Transport},
    error::RealtimeError,
    events::{broadcast_body, channel_name, join_outcome},
    handlers::{BroadcastHandler, SubscribeHandler},
    types::{BroadcastMessage, SubscriptionState},
};

/// Realtime client for one Supabase project.
///
/// Socket, heartbeat and Phoenix framing belong to `supabase-realtime-rs`;
/// this type maps its channels onto [`Transport`] and [`Channel`].
pub struct RealtimeClient {
    url: String,
    host: String,
    api_key: String,
    heartbeat: Duration,
    join_timeout: Duration,
    inner: Option<supabase::RealtimeClient>,
}

impl RealtimeClient {
    pub fn new(credentials: &SupabaseCredentials, settings: &RealtimeConfig) -> Self {
        Self {
            url: credentials.realtime_url(),
            host: credentials.url.clone(),
            api_key: credentials.anon_key.clone(),
            heartbeat: Duration::from_secs(settings.heartbeat_interval_secs.max(1)),
            join_timeout: Duration::from_millis(settings.join_timeout_ms),
            inner: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    fn options(&self) -> RealtimeClientOptions {
        RealtimeClientOptions {
            api_key: self.api_key.clone(),
            heartbeat_interval: Some(self.heartbeat.as_millis() as u64),
            // joins authorize with the anon key unless a user token is set
            access_token: Some(self.api_key.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transport for RealtimeClient {
    type Channel = RealtimeChannel;

    fn endpoint(&self) -> String {
        format!("wss://{}/realtime/v1", self.host)
    }

    async fn connect(&mut self) -> Result<(), RealtimeError> {
        let endpoint = self.endpoint();
        info!(%endpoint, "connecting to realtime endpoint");

        let client = supabase::RealtimeClient::new(self.url.as_str(), self.options())
            .map_err(|e| RealtimeError::ConnectionFailed(format!("{endpoint}: {e}")))?;
        client
            .connect()
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(format!("{endpoint}: {e}")))?;

        info!(%endpoint, "realtime socket open");
        self.inner = Some(client);
        Ok(())
    }

    async fn channel(&self, topic: &str) -> Result<RealtimeChannel, RealtimeError> {
        let client = self.inner.as_ref().ok_or(RealtimeError::NotConnected)?;
        let inner = client
            .channel(channel_name(topic), RealtimeChannelOptions::default())
            .await;
        Ok(RealtimeChannel::new(inner, client.clone(), self.join_timeout))
    }
}

/// A topic on a [`RealtimeClient`] connection.
pub struct RealtimeChannel {
    inner: Arc<supabase::RealtimeChannel>,
    client: supabase::RealtimeClient,
    join_timeout: Duration,
    state: watch::Receiver<SubscriptionState>,
    /// Moved into the listener task on `subscribe`.
    state_tx: Option<watch::Sender<SubscriptionState>>,
    listener: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    fn new(
        inner: Arc<supabase::RealtimeChannel>,
        client: supabase::RealtimeClient,
        join_timeout: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(SubscriptionState::Pending);
        Self {
            inner,
            client,
            join_timeout,
            state: rx,
            state_tx: Some(tx),
            listener: None,
        }
    }

    fn stop_listener(&mut self) -> bool {
        match self.listener.take() {
            Some(listener) => {
                listener.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

impl fmt::Display for RealtimeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.topic(), *self.state.borrow())
    }
}

#[async_trait]
impl Channel for RealtimeChannel {
    fn topic(&self) -> &str {
        self.inner.topic()
    }

    fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    async fn subscribe(
        &mut self,
        event: &str,
        on_broadcast: Arc<dyn BroadcastHandler>,
        on_subscribe: Arc<dyn SubscribeHandler>,
    ) -> Result<(), RealtimeError> {
        let state_tx = self
            .state_tx
            .take()
            .ok_or_else(|| RealtimeError::AlreadySubscribed {
                topic: self.topic().to_string(),
            })?;

        // listeners must be registered before the join goes out
        let events = ChannelEvents {
            broadcasts: self.inner.on(ChannelEvent::broadcast(event)).await,
            replies: self.inner.on(ChannelEvent::System(SystemEvent::Reply)).await,
            errors: self.inner.on(ChannelEvent::System(SystemEvent::Error)).await,
            closes: self.inner.on(ChannelEvent::System(SystemEvent::Close)).await,
        };
        let route = Route {
            state: state_tx,
            on_broadcast,
            on_subscribe,
        };
        self.listener = Some(tokio::spawn(listen(events, route, self.join_timeout)));

        if let Err(e) = self.inner.subscribe().await {
            self.stop_listener();
            return Err(e.into());
        }
        debug!(topic = %self.topic(), %event, "join sent");
        Ok(())
    }

    async fn send_broadcast(&self, message: &BroadcastMessage) -> Result<(), RealtimeError> {
        // the client falls back to HTTP when the socket is down; broadcasts here are socket-only
        if !self.client.is_connected().await {
            return Err(RealtimeError::NotConnected);
        }
        let payload = serde_json::to_value(&message.payload)?;
        self.inner
            .send(ChannelEvent::broadcast(message.event.as_str()), payload)
            .await
            .map_err(|e| RealtimeError::SendFailed(e.to_string()))
    }

    async fn unsubscribe(&mut self) -> Result<(), RealtimeError> {
        if !self.stop_listener() {
            return Ok(());
        }
        self.inner.unsubscribe().await?;
        debug!(topic = %self.topic(), "leave sent");
        Ok(())
    }
}

/// Listener receivers registered on the library channel.
struct ChannelEvents {
    broadcasts: mpsc::Receiver<EventPayload>,
    replies: mpsc::Receiver<EventPayload>,
    errors: mpsc::Receiver<EventPayload>,
    closes: mpsc::Receiver<EventPayload>,
}

struct Route {
    state: watch::Sender<SubscriptionState>,
    on_broadcast: Arc<dyn BroadcastHandler>,
    on_subscribe: Arc<dyn SubscribeHandler>,
}

impl Route {
    /// Publish a new state; handlers only hear about actual changes.
    fn transition(&self, next: SubscriptionState, error: Option<&str>) {
        let previous = self.state.send_replace(next);
        if previous == next {
            return;
        }
        info!(state = %next, error = error.unwrap_or_default(), "subscription state changed");
        self.on_subscribe.on_subscribe(next, error);
    }

    fn current(&self) -> SubscriptionState {
        *self.state.borrow()
    }
}

/// Drive one channel's callbacks until every listener closes.
///
/// The first `phx_reply` on the topic answers the join. Later replies belong
/// to broadcasts or the leave and are ignored. A zero `join_timeout`
/// disables the deadline.
async fn listen(mut events: ChannelEvents, route: Route, join_timeout: Duration) {
    let deadline = tokio::time::sleep(join_timeout);
    tokio::pin!(deadline);
    let mut waiting = !join_timeout.is_zero();
    let mut answered = false;

    loop {
        tokio::select! {
            Some(payload) = events.replies.recv() => {
                if answered {
                    continue;
                }
                answered = true;
                if let EventPayload::System(reply) = payload {
                    let (state, reason) = join_outcome(&reply);
                    route.transition(state, reason.as_deref());
                }
            }
            Some(payload) = events.broadcasts.recv() => {
                if let EventPayload::Broadcast(frame) = payload {
                    route.on_broadcast.on_broadcast(broadcast_body(&frame));
                }
            }
            Some(_) = events.errors.recv() => {
                route.transition(SubscriptionState::Failed, Some("channel error"));
            }
            Some(_) = events.closes.recv() => {
                route.transition(SubscriptionState::Failed, Some("channel closed"));
            }
            () = &mut deadline, if waiting => {
                waiting = false;
                if !answered && route.current() == SubscriptionState::Pending {
                    warn!("join timed out");
                    route.transition(SubscriptionState::Failed, Some("timed out"));
                }
            }
            else => break,
        }
    }
    debug!("channel listener finished");
}
