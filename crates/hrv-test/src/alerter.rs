//! Alerter that keeps every alert for later inspection

use parking_lot::Mutex;

use hrv_link::{Alert, Alerter};

#[derive(Default)]
pub struct RecordingAlerter {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn count(&self, alert: Alert) -> usize {
        self.alerts.lock().iter().filter(|a| **a == alert).count()
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

impl Alerter for RecordingAlerter {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}
