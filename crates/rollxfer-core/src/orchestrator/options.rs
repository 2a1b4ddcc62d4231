use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative stop request shared between the operator (Ctrl-C handler)
/// and a running session. Checked between files and on every poll tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a streaming command is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Sleep between readiness checks when no output is waiting.
    pub interval: Duration,
    /// Give up on a single invocation after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            timeout: None,
        }
    }
}

/// Options for a transfer session.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub poll: PollOptions,
    pub stop: StopSignal,
}
