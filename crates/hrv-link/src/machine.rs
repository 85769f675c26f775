//! Link state machine
//!
//! Pure transition logic, no I/O. The async driver in [`crate::manager`]
//! feeds inputs and performs the returned actions, so a flapping link loops
//! through explicit transitions instead of recursing.
//!
//! ```text
//! Idle -> Discovering -> Connecting -> Subscribed -> Disconnected -> Discovering
//!              ^              |
//!              +--------------+  (retries exhausted, pairing cleared)
//! ```

use std::fmt;

use tracing::debug;

/// Link lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Discovering,
    Connecting,
    Subscribed,
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Idle => "idle",
            LinkState::Discovering => "discovering",
            LinkState::Connecting => "connecting",
            LinkState::Subscribed => "subscribed",
            LinkState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Events fed to the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkInput {
    /// Manager started or restarted
    Start,
    /// A device identity is known (stored pairing or fresh discovery)
    Discovered,
    /// One connect attempt failed
    ConnectFailed,
    /// Channel opened
    Connected,
    /// The platform reported the channel dropped
    LinkLost,
    /// Disconnect side effects are done
    Resume,
    /// Explicit "reconnect now"
    ReconnectRequested,
    /// The connect/subscribe sequence failed as a whole
    Aborted,
}

/// Side effect the driver must perform after a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkAction {
    None,
    /// Drop the stored pairing; the identity is stale or out of range
    ClearPairing,
    /// Fire the disconnect side effect
    NotifyDisconnected,
    /// Restart the whole sequence after the restart delay
    ScheduleRestart,
}

/// Outcome of one input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: LinkState,
    pub to: LinkState,
    pub action: LinkAction,
}

/// Deterministic link lifecycle
#[derive(Clone, Debug)]
pub struct LinkMachine {
    state: LinkState,
    failed_attempts: u32,
    max_attempts: u32,
}

impl LinkMachine {
    pub fn new(max_attempts: u32) -> Self {
        LinkMachine {
            state: LinkState::Idle,
            failed_attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Consecutive failed attempts in the current Connecting pass
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn step(&mut self, input: LinkInput) -> Transition {
        use LinkInput::*;
        use LinkState::*;

        let from = self.state;
        let (to, action) = match (from, input) {
            (_, Aborted) => {
                self.failed_attempts = 0;
                (Idle, LinkAction::ScheduleRestart)
            }
            (Idle, Start) => (Discovering, LinkAction::None),
            (Discovering, Discovered) => {
                self.failed_attempts = 0;
                (Connecting, LinkAction::None)
            }
            (Connecting, ConnectFailed) => {
                self.failed_attempts += 1;
                if self.failed_attempts >= self.max_attempts {
                    self.failed_attempts = 0;
                    (Discovering, LinkAction::ClearPairing)
                } else {
                    (Connecting, LinkAction::None)
                }
            }
            (Connecting, Connected) => {
                self.failed_attempts = 0;
                (Subscribed, LinkAction::None)
            }
            (Subscribed, LinkLost) => (Disconnected, LinkAction::NotifyDisconnected),
            (Disconnected, Resume) => (Discovering, LinkAction::None),
            (Subscribed | Disconnected, ReconnectRequested) => (Discovering, LinkAction::None),
            (state, ignored) => {
                debug!(%state, ?ignored, "input ignored");
                (state, LinkAction::None)
            }
        };

        self.state = to;
        Transition { from, to, action }
    }
}
