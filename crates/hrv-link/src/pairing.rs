//! Persisted device pairing

use std::sync::Arc;

use hrv_core::{HrvResult, KeyValueStore, DEVICE_ID_KEY};

use crate::DeviceId;

/// Identity of the previously connected wearable, persisted in preferences
#[derive(Clone)]
pub struct PairingStore {
    prefs: Arc<dyn KeyValueStore>,
}

impl PairingStore {
    pub fn new(prefs: Arc<dyn KeyValueStore>) -> Self {
        PairingStore { prefs }
    }

    /// Stored pairing; a blank value counts as unpaired
    pub fn load(&self) -> HrvResult<Option<DeviceId>> {
        Ok(self
            .prefs
            .get(DEVICE_ID_KEY)?
            .filter(|id| !id.trim().is_empty())
            .map(DeviceId::new))
    }

    pub fn save(&self, device: &DeviceId) -> HrvResult<()> {
        self.prefs.set(DEVICE_ID_KEY, device.as_str())
    }

    pub fn clear(&self) -> HrvResult<()> {
        self.prefs.remove(DEVICE_ID_KEY)
    }
}
