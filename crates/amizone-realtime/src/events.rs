//! Interpretation of the payloads the realtime client hands to channel
//! listeners.
//!
//! Wire shapes, as delivered by `supabase-realtime-rs`:
//!
//! ```text
//! phx_reply  {"status": "ok" | "error", "response": {...}}
//! broadcast  {"type": "broadcast", "event": "my_event", "payload": {...}}
//! ```

use serde_json::Value;

use crate::types::SubscriptionState;

/// Wire prefix the client adds to every channel topic.
pub const TOPIC_PREFIX: &str = "realtime:";

/// Channel name without the wire prefix; the client adds it back.
pub fn channel_name(topic: &str) -> &str {
    topic.strip_prefix(TOPIC_PREFIX).unwrap_or(topic)
}

/// State a join reply moves the channel to, plus the failure reason.
pub fn join_outcome(reply: &Value) -> (SubscriptionState, Option<String>) {
    match reply.get("status").and_then(Value::as_str) {
        Some("ok") => (SubscriptionState::Subscribed, None),
        status => {
            let response = reply.get("response").unwrap_or(&Value::Null);
            let reason = match response.get("reason").and_then(Value::as_str) {
                Some(reason) => reason.to_string(),
                None if !response.is_null() => response.to_string(),
                None => status.unwrap_or("join rejected").to_string(),
            };
            (SubscriptionState::Failed, Some(reason))
        }
    }
}

/// The user payload inside a broadcast frame.
///
/// Frames without an inner `payload` are passed through whole.
pub fn broadcast_body(frame: &Value) -> &Value {
    frame.get("payload").unwrap_or(frame)
}
