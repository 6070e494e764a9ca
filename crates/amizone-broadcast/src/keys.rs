use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A source of interactive input units (one character per unit).
pub trait KeySource: Send {
    /// Zero-duration check: return the next unit if one is already
    /// available, `None` otherwise. Never blocks.
    fn try_next(&mut self) -> Option<String>;
}

/// Keys typed on standard input.
///
/// A background task reads whole lines (the terminal is line-buffered) and
/// queues every character, the trailing newline included. The loop takes
/// one unit per iteration, so `ab⏎` yields `a`, `b` and an empty unit on
/// three consecutive checks.
///
/// The queue holds at most [`KEY_QUEUE_CAPACITY`] units. When it is full the
/// reader task waits, so pasting or piping a large input cannot grow memory
/// faster than the loop drains it.
pub struct StdinKeys {
    rx: mpsc::Receiver<char>,
}

/// Units buffered ahead of the loop before the reader stops reading.
pub const KEY_QUEUE_CAPACITY: usize = 256;

impl StdinKeys {
    /// Start reading the process's standard input.
    pub fn spawn() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::with_capacity(reader, KEY_QUEUE_CAPACITY)
    }

    pub fn with_capacity<R>(reader: R, capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(pump(reader, tx));
        Self { rx }
    }
}

impl KeySource for StdinKeys {
    fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok().map(String::from)
    }
}

async fn pump<R>(reader: R, tx: mpsc::Sender<char>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                for c in line.chars().chain(std::iter::once('\n')) {
                    if tx.send(c).await.is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                return;
            }
        }
    }
}
