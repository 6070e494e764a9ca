use std::sync::Arc;

use amizone_core::config::RealtimeConfig;
use amizone_realtime::{Channel, RealtimeError, Transport};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::{
    broadcast::BroadcastLoop,
    keys::KeySource,
    progress::{ConsoleHandlers, Progress},
};

/// Connect, open and subscribe the channel, then run the broadcast loop.
///
/// Any setup failure is reported as a single `connect to realtime failed`
/// line and the function returns normally; the loop is never entered.
pub async fn connect_realtime<T, K>(
    transport: T,
    keys: K,
    settings: &RealtimeConfig,
    progress: Arc<dyn Progress>,
    shutdown: watch::Receiver<bool>,
) where
    T: Transport,
    K: KeySource,
{
    let channel = match open_channel(transport, settings, Arc::clone(&progress)).await {
        Ok(channel) => channel,
        Err(e) => {
            error!(error = %e, "realtime setup failed");
            progress.emit(&format!("connect to realtime failed: {e}"));
            return;
        }
    };

    let mut channel = BroadcastLoop::new(channel, keys, settings, progress)
        .run(shutdown)
        .await;

    if let Err(e) = channel.unsubscribe().await {
        debug!(error = %e, "leaving channel failed");
    }
}

async fn open_channel<T: Transport>(
    mut transport: T,
    settings: &RealtimeConfig,
    progress: Arc<dyn Progress>,
) -> Result<T::Channel, RealtimeError> {
    transport.connect().await?;
    progress.step("1", &format!("connected to: {}", transport.endpoint()));

    let mut channel = transport.channel(&settings.topic).await?;
    progress.step("2", &format!("channel: {}", channel.topic()));

    let handlers = Arc::new(ConsoleHandlers::new(progress));
    channel
        .subscribe(&settings.event, handlers.clone(), handlers)
        .await?;
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::testing::{FailAt, MockTransport, RecordingProgress, ScriptedKeys};

    /// Key source that must never be consulted.
    struct Untouched(Arc<Mutex<usize>>);

    impl KeySource for Untouched {
        fn try_next(&mut self) -> Option<String> {
            *self.0.lock().unwrap() += 1;
            None
        }
    }

    async fn failing_setup(fail_at: FailAt) -> (usize, Vec<String>) {
        let progress = Arc::new(RecordingProgress::default());
        let polls = Arc::new(Mutex::new(0));
        let (_tx, shutdown) = watch::channel(false);

        connect_realtime(
            MockTransport::new(fail_at),
            Untouched(Arc::clone(&polls)),
            &RealtimeConfig::default(),
            progress.clone(),
            shutdown,
        )
        .await;

        let polls = *polls.lock().unwrap();
        (polls, progress.lines())
    }

    #[tokio::test]
    async fn channel_failure_skips_the_loop() {
        let (polls, lines) = failing_setup(FailAt::Channel).await;

        assert_eq!(polls, 0);
        let failures: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("connect to realtime failed:"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(!lines.iter().any(|l| l.starts_with(" 5|")));
    }

    #[tokio::test]
    async fn connect_failure_logs_once() {
        let (polls, lines) = failing_setup(FailAt::Connect).await;

        assert_eq!(polls, 0);
        assert_eq!(
            lines,
            vec!["connect to realtime failed: Connection failed: refused"]
        );
    }

    #[tokio::test]
    async fn subscribe_failure_skips_the_loop() {
        let (polls, lines) = failing_setup(FailAt::Subscribe).await;

        assert_eq!(polls, 0);
        assert_eq!(
            lines,
            vec![
                " 1| connected to: wss://mock/realtime/v1",
                " 2| channel: realtime:ami_zone_channel",
                "connect to realtime failed: Not connected",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_reports_every_step() {
        let progress = Arc::new(RecordingProgress::default());
        let transport = MockTransport::new(FailAt::Nothing);
        let sent = Arc::clone(&transport.sent_log);
        let (keys, shutdown) = ScriptedKeys::new(&[Some("b")]);

        connect_realtime(
            transport,
            keys,
            &RealtimeConfig::default(),
            progress.clone(),
            shutdown,
        )
        .await;

        assert_eq!(
            progress.lines(),
            vec![
                " 1| connected to: wss://mock/realtime/v1",
                " 2| channel: realtime:ami_zone_channel",
                " 4| on_subscribe - status change: subscribed, none",
                " 5| press 'b' for broadcast",
                " 6| send broadcast for no=1",
            ]
        );
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload.msg, "HuHu Android (key='b')");
    }
}
