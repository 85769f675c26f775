//! Error-burst monitor
//!
//! Counts "readjustment needed" faults. The first fault arms a single expiry
//! deadline; if the count reaches the limit before the deadline, one
//! escalation fires, the deadline is cancelled and counting starts over.
//! Other codes are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use hrv_core::ErrorFrame;
use hrv_wire::decode_error;

use crate::{Alert, Alerter, LinkConfig};

/// Single-owner fault counter with one pending expiry
pub struct ErrorBurstMonitor {
    count: u32,
    deadline: Option<Instant>,
    window: Duration,
    limit: u32,
    code: u8,
    escalations: u64,
    alerter: Arc<dyn Alerter>,
}

impl ErrorBurstMonitor {
    pub fn new(config: &LinkConfig, alerter: Arc<dyn Alerter>) -> Self {
        ErrorBurstMonitor {
            count: 0,
            deadline: None,
            window: config.burst_window,
            limit: config.burst_limit.max(1),
            code: config.readjust_code,
            escalations: 0,
            alerter,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current count expires, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn escalations(&self) -> u64 {
        self.escalations
    }

    /// Count one fault; returns true if it escalated.
    ///
    /// An escalation cancels the deadline and resets the count to zero, so
    /// within one window every `limit`-th fault escalates again (the 10th of
    /// a burst with the default limit of 5, not the 6th).
    pub fn record(&mut self, frame: ErrorFrame, now: Instant) -> bool {
        if frame.code != self.code {
            info!(code = frame.code, "device reported error");
            return false;
        }

        self.count += 1;
        warn!(code = frame.code, count = self.count, "sensor readjustment needed");

        if self.count == 1 {
            self.deadline = Some(now + self.window);
        }

        if self.count >= self.limit {
            self.count = 0;
            self.deadline = None;
            self.escalations += 1;
            warn!(limit = self.limit, "error burst, escalating");
            self.alerter.alert(Alert::ErrorBurst);
            return true;
        }

        false
    }

    /// Reset the count if its deadline has passed
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                debug!(count = self.count, "error burst window expired");
                self.count = 0;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Decode and count one error notification; malformed frames are dropped
    pub fn handle_frame(&mut self, payload: &[u8], now: Instant) -> bool {
        match decode_error(payload) {
            Ok(frame) => self.record(frame, now),
            Err(e) => {
                warn!(error = %e, "dropping error frame");
                false
            }
        }
    }

    /// Consume error notifications until the channel closes
    pub async fn run(mut self, mut frames: mpsc::UnboundedReceiver<Bytes>) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(payload) => {
                        self.handle_frame(&payload, Instant::now());
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire(Instant::now());
                }
            }
        }
        debug!("error frame channel closed");
    }
}
