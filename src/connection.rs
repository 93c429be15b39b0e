//! Non-blocking connection supervision.
//!
//! [`ConnectionMonitor`] tracks a [`Link`] through
//! `Disconnected -> Connecting -> Connected` and is polled from the same
//! loop that ticks the node, so a lost connection never stalls motion or
//! the safety override.
//!
//! ```text
//!                 start_connect()
//!  Disconnected ------------------> Connecting
//!       ^   ^                        |      |
//!       |   +---- timeout/error -----+      | is_up()
//!       |                                   v
//!       +---------- link lost ---------- Connected
//! ```

use crate::traits::Link;

/// Connection state of a supervised link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No connection and no attempt in progress.
    Disconnected,
    /// An attempt was started and has not completed.
    Connecting,
    /// The link is usable.
    Connected,
}

/// Drives reconnection attempts without blocking.
#[derive(Clone, Debug)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    retry_delay_ms: u64,
    attempt_started_ms: Option<u64>,
    last_attempt_ms: Option<u64>,
    attempts: u32,
}

impl ConnectionMonitor {
    /// Monitor that waits `retry_delay_ms` between attempts and gives up on an
    /// attempt after the same delay.
    pub fn new(retry_delay_ms: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_delay_ms: u64::from(retry_delay_ms),
            attempt_started_ms: None,
            last_attempt_ms: None,
            attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while connected.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Attempts started since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Observe the link and start an attempt if one is due.
    ///
    /// Returns the state after polling. Never blocks.
    pub fn poll<L: Link>(&mut self, now_ms: u64, link: &mut L) -> ConnectionState {
        let next = match self.state {
            ConnectionState::Connected => {
                if link.is_up() {
                    ConnectionState::Connected
                } else {
                    log::warn!("Connection lost");
                    self.try_start(now_ms, link)
                }
            }
            ConnectionState::Connecting => {
                if link.is_up() {
                    log::info!("Connected after {} attempt(s)", self.attempts);
                    self.attempts = 0;
                    self.attempt_started_ms = None;
                    ConnectionState::Connected
                } else if self.attempt_timed_out(now_ms) {
                    log::warn!("Connection attempt timed out");
                    self.attempt_started_ms = None;
                    ConnectionState::Disconnected
                } else {
                    ConnectionState::Connecting
                }
            }
            ConnectionState::Disconnected => {
                if link.is_up() {
                    ConnectionState::Connected
                } else if self.retry_due(now_ms) {
                    self.try_start(now_ms, link)
                } else {
                    ConnectionState::Disconnected
                }
            }
        };
        self.state = next;
        next
    }

    fn try_start<L: Link>(&mut self, now_ms: u64, link: &mut L) -> ConnectionState {
        self.last_attempt_ms = Some(now_ms);
        self.attempts = self.attempts.saturating_add(1);
        match link.start_connect() {
            Ok(()) => {
                log::info!("Connecting (attempt {})", self.attempts);
                self.attempt_started_ms = Some(now_ms);
                ConnectionState::Connecting
            }
            Err(e) => {
                log::warn!("Connection attempt failed: {:?}", e);
                ConnectionState::Disconnected
            }
        }
    }

    fn retry_due(&self, now_ms: u64) -> bool {
        match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.retry_delay_ms,
        }
    }

    fn attempt_timed_out(&self, now_ms: u64) -> bool {
        match self.attempt_started_ms {
            None => true,
            Some(start) => now_ms.saturating_sub(start) >= self.retry_delay_ms,
        }
    }
}
