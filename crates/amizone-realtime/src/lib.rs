//! Broadcast channels on a Supabase Realtime endpoint.
//!
//! The [`Transport`] / [`Channel`] traits are what the broadcast loop is
//! written against. [`RealtimeClient`] implements them on top of the
//! `supabase-realtime-rs` client, which owns the socket and the Phoenix
//! protocol.

pub mod channel;
pub mod client;
pub mod error;
pub mod events;
pub mod handlers;
pub mod types;

pub use channel::{Channel, Transport};
pub use client::{RealtimeChannel, RealtimeClient};
pub use error::RealtimeError;
pub use handlers::{BroadcastHandler, SubscribeHandler};
pub use types::{BroadcastMessage, BroadcastPayload, SubscriptionState};
