use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// One-shot reconnect timer.
///
/// The policy is a fixed delay with no backoff, no jitter and no retry cap:
/// the client retries forever until it is closed. At most one reconnect is
/// armed at a time; cancelling (on close, or on an explicit connect) drops it.
#[derive(Debug, Default)]
pub struct ReconnectScheduler {
    pending: Option<Pin<Box<Sleep>>>,
}

impl ReconnectScheduler {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Arm the timer, replacing any reconnect already armed.
    pub fn schedule(&mut self, after: Duration) {
        self.pending = Some(Box::pin(tokio::time::sleep(after)));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|s| s.deadline())
    }

    /// Resolve once the armed delay has elapsed, disarming the timer.
    /// Pending forever while nothing is armed.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.pending = None;
            }
            None => futures::future::pending::<()>().await,
        }
    }
}
