use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of a broadcast event.
/// Wire: `{ "msg": "HuHu Android (key='b')", "no": 3 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub msg: String,
    /// Per-process counter, starting at 1.
    pub no: u64,
}

/// An outbound broadcast: event name plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub event: String,
    pub payload: BroadcastPayload,
}

impl BroadcastMessage {
    /// Build the message sent for a single keypress.
    pub fn keypress(event: &str, greeting: &str, key: &str, no: u64) -> Self {
        Self {
            event: event.to_string(),
            payload: BroadcastPayload {
                msg: format!("{greeting} (key='{key}')"),
                no,
            },
        }
    }
}

/// Channel subscription state as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Join sent, no reply yet.
    Pending,
    /// Join acknowledged; broadcasts will be delivered.
    Subscribed,
    /// Join rejected, timed out, or the channel was closed.
    Failed,
}

impl SubscriptionState {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, SubscriptionState::Subscribed)
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Pending => write!(f, "pending"),
            SubscriptionState::Subscribed => write!(f, "subscribed"),
            SubscriptionState::Failed => write!(f, "failed"),
        }
    }
}
