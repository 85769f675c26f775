//! Alerting port
//!
//! Delivery (push notifications, banners) is external. The link reports
//! what happened; an [`Alerter`] decides what the user sees.

use std::sync::Arc;

use tracing::{debug, info, warn};

use hrv_core::{ClassificationState, KeyValueStore, NOTIFICATIONS_KEY};

/// Something the user may need to hear about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Alert {
    /// The stress classification changed
    StateChanged(ClassificationState),
    /// Repeated sensor-fit faults within the burst window
    ErrorBurst,
    /// The wearable link dropped
    Disconnected,
    /// A wearable link was established
    Connected,
}

impl Alert {
    pub fn title(&self) -> &'static str {
        match self {
            Alert::StateChanged(ClassificationState::Normal) => "Stress levels look good",
            Alert::StateChanged(ClassificationState::Fatigued) => "You might be fatigued",
            Alert::StateChanged(ClassificationState::Stressed) => "You might be stressed",
            Alert::ErrorBurst => "Device misread",
            Alert::Disconnected => "Device disconnected",
            Alert::Connected => "Device connected",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Alert::StateChanged(ClassificationState::Normal) => {
                "Your recent HRV is in range. Keep it up!"
            }
            Alert::StateChanged(ClassificationState::Fatigued) => {
                "Try taking a break to catch some rest."
            }
            Alert::StateChanged(ClassificationState::Stressed) => {
                "Try an activity from the advice section to de-stress."
            }
            Alert::ErrorBurst => {
                "The sensor is not reading your heart rate properly. \
                 Readjust the fit so the sensor rests on the fingertip."
            }
            Alert::Disconnected => "The wearable disconnected. Reconnecting in the background.",
            Alert::Connected => "The wearable is connected and streaming.",
        }
    }
}

/// Receives alerts; implementations must not block
pub trait Alerter: Send + Sync {
    fn alert(&self, alert: Alert);
}

/// Emits alerts as tracing events
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn alert(&self, alert: Alert) {
        info!(?alert, title = alert.title(), "alert");
    }
}

/// Forwards alerts only while the user's notification switch is on
pub struct GatedAlerter<A> {
    inner: A,
    prefs: Arc<dyn KeyValueStore>,
}

impl<A: Alerter> GatedAlerter<A> {
    pub fn new(inner: A, prefs: Arc<dyn KeyValueStore>) -> Self {
        GatedAlerter { inner, prefs }
    }

    pub fn enabled(&self) -> bool {
        match self.prefs.get(NOTIFICATIONS_KEY) {
            Ok(value) => value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            Err(e) => {
                warn!(error = %e, "notification switch unreadable, suppressing");
                false
            }
        }
    }
}

impl<A: Alerter> Alerter for GatedAlerter<A> {
    fn alert(&self, alert: Alert) {
        if self.enabled() {
            self.inner.alert(alert);
        } else {
            debug!(?alert, "notifications off, alert suppressed");
        }
    }
}

impl<A: Alerter + ?Sized> Alerter for Arc<A> {
    fn alert(&self, alert: Alert) {
        (**self).alert(alert)
    }
}
