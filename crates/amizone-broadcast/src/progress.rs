use std::sync::Arc;

use amizone_realtime::{BroadcastHandler, SubscribeHandler, SubscriptionState};
use serde_json::Value;

/// Sink for the human-readable progress lines (` 1| connected to: ...`).
///
/// Purely diagnostic; diagnostics for machines go through `tracing`.
pub trait Progress: Send + Sync {
    fn emit(&self, line: &str);

    /// Emit a numbered step, tag right-aligned to two columns.
    fn step(&self, tag: &str, text: &str) {
        self.emit(&format!("{tag:>2}| {text}"));
    }
}

/// Writes progress lines to stdout.
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn emit(&self, line: &str) {
        println!("{line}");
    }
}

/// Channel handlers that only report what happened.
pub struct ConsoleHandlers {
    progress: Arc<dyn Progress>,
}

impl ConsoleHandlers {
    pub fn new(progress: Arc<dyn Progress>) -> Self {
        Self { progress }
    }
}

impl BroadcastHandler for ConsoleHandlers {
    fn on_broadcast(&self, payload: &Value) {
        self.progress
            .step("3", &format!("handle_broadcast - message received: {payload}"));
    }
}

impl SubscribeHandler for ConsoleHandlers {
    fn on_subscribe(&self, state: SubscriptionState, error: Option<&str>) {
        self.progress.step(
            "4",
            &format!(
                "on_subscribe - status change: {state}, {}",
                error.unwrap_or("none")
            ),
        );
    }
}
