//! Turn keypresses into realtime broadcasts.
//!
//! [`BroadcastLoop`] checks a [`KeySource`] without blocking, sends one
//! broadcast per non-empty key, then sleeps for the configured interval.
//! [`connect_realtime`] performs the setup around it and reports progress
//! as numbered console lines.

pub mod broadcast;
pub mod keys;
pub mod progress;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::BroadcastLoop;
pub use keys::{KeySource, StdinKeys};
pub use progress::{ConsoleHandlers, ConsoleProgress, Progress};
pub use session::connect_realtime;
