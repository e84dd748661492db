use std::time::Duration;

use tokio::time::Instant;

/// Missed ping intervals tolerated before a peer counts as gone.
const MISSED_INTERVALS: u32 = 2;

/// Liveness tracking for one WebSocket peer.
///
/// The socket loop pings once per interval and records
/// any inbound frame (pongs included) as activity. A peer that stays silent
/// for more than two intervals is considered stale and its session is
/// closed.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last_seen: Instant,
}

impl Heartbeat {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_seen: now,
        }
    }

    /// Note that the peer sent something at `now`.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Whether the peer has been silent for longer than the allowed window.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > self.interval * MISSED_INTERVALS
    }
}
