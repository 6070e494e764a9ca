use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::RealtimeError,
    handlers::{BroadcastHandler, SubscribeHandler},
    types::{BroadcastMessage, SubscriptionState},
};

/// A connection to a realtime endpoint that can open channels.
#[async_trait]
pub trait Transport: Send {
    type Channel: Channel;

    /// Endpoint description for logs. Must not contain the API key.
    fn endpoint(&self) -> String;

    /// Establish the underlying connection.
    async fn connect(&mut self) -> Result<(), RealtimeError>;

    /// Create a channel for `topic`. No network traffic until `subscribe`.
    async fn channel(&self, topic: &str) -> Result<Self::Channel, RealtimeError>;
}

/// A single topic on a realtime connection.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Wire topic, e.g. `"realtime:ami_zone_channel"`.
    fn topic(&self) -> &str;

    /// Current subscription state, without blocking.
    fn state(&self) -> SubscriptionState;

    /// Register the handlers and send the join request.
    ///
    /// Returns as soon as the join is queued. The outcome arrives later
    /// through `on_subscribe` and [`Channel::state`].
    async fn subscribe(
        &mut self,
        event: &str,
        on_broadcast: Arc<dyn BroadcastHandler>,
        on_subscribe: Arc<dyn SubscribeHandler>,
    ) -> Result<(), RealtimeError>;

    /// Queue a broadcast. Does not wait for delivery confirmation.
    async fn send_broadcast(&self, message: &BroadcastMessage) -> Result<(), RealtimeError>;

    /// Leave the topic. Handlers are dropped; no further callbacks fire.
    async fn unsubscribe(&mut self) -> Result<(), RealtimeError>;
}
