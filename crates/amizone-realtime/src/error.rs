use thiserror::Error;

/// Errors raised while talking to the realtime endpoint.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The websocket could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A channel was requested before `connect` succeeded.
    #[error("Not connected")]
    NotConnected,

    /// `subscribe` was called twice on the same channel.
    #[error("Channel already subscribed: {topic}")]
    AlreadySubscribed { topic: String },

    /// The broadcast could not be pushed onto the socket.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Join or leave rejected by the realtime client.
    #[error("Realtime client error: {0}")]
    Client(#[from] supabase_realtime_rs::RealtimeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
