//! Liveness probing for the broker connection.
//!
//! Every heartbeat interval the client checks whether anything arrived since
//! the previous tick. If something did, it clears the flag and sends a
//! `ping`; if nothing did, the peer is considered dead and the transport is
//! torn down. A silent connection is therefore terminated on the second tick
//! after the last inbound frame.
//!
//! [`HeartbeatMonitor`] holds the decision logic and no timers;
//! [`HeartbeatTimer`] is the tokio interval the client driver polls.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::MIN_HEARTBEAT_INTERVAL;

/// Outcome of one heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Monitor not running; nothing to do
    Idle,
    /// Peer was alive; send a ping and wait for the next tick
    Ping,
    /// Nothing arrived for a whole interval; the monitor stopped itself
    Expired,
}

#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    alive: bool,
    running: bool,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            alive: false,
            running: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Begin a fresh monitoring period. The peer counts as alive.
    pub fn start(&mut self) {
        self.running = true;
        self.alive = true;
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Record inbound traffic.
    pub fn mark_alive(&mut self) {
        self.alive = true;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        if !self.alive {
            self.running = false;
            return Tick::Expired;
        }
        self.alive = false;
        Tick::Ping
    }
}

/// Fixed-interval timer backing a [`HeartbeatMonitor`].
///
/// The first tick fires one full interval after [`HeartbeatTimer::start`].
/// Missed ticks are skipped rather than burst.
#[derive(Debug, Default)]
pub struct HeartbeatTimer {
    ticker: Option<Interval>,
}

impl HeartbeatTimer {
    pub fn new() -> Self {
        Self { ticker: None }
    }

    /// (Re)arm the timer. A zero interval is raised to
    /// [`MIN_HEARTBEAT_INTERVAL`].
    pub fn start(&mut self, interval: Duration) {
        let interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    pub fn stop(&mut self) {
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Resolve at the next tick; pending forever while stopped.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => futures::future::pending::<()>().await,
        }
    }
}
