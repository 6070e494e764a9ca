use serde_json::Value;

use crate::types::SubscriptionState;

/// Called for every broadcast received on a subscribed channel.
pub trait BroadcastHandler: Send + Sync {
    fn on_broadcast(&self, payload: &Value);
}

/// Called whenever the subscription state changes.
///
/// `error` is set when the change is a failure (rejected join, timeout,
/// closed channel).
pub trait SubscribeHandler: Send + Sync {
    fn on_subscribe(&self, state: SubscriptionState, error: Option<&str>);
}
