//! End-to-end harness: the full runtime over a simulated wearable and
//! in-memory storage, driven by a manual clock.

use std::sync::Arc;
use std::time::Duration;

use hrv_core::{ManualClock, MemoryKeyValueStore};
use hrv_link::{LinkConfig, LinkState};
use hrv_runtime::{Runtime, RuntimeHandle, RuntimeParts};
use hrv_store::MemoryPartitionStorage;

use crate::{RecordingAlerter, SimulatedWearable};

/// Wall-clock time every harness starts at (2023-11-14 22:13:20 UTC)
pub const HARNESS_EPOCH: i64 = 1_700_000_000;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const POLL_LIMIT: usize = 5_000;

pub struct Harness {
    pub wearable: Arc<SimulatedWearable>,
    pub alerts: Arc<RecordingAlerter>,
    pub storage: Arc<MemoryPartitionStorage>,
    pub prefs: Arc<MemoryKeyValueStore>,
    pub clock: ManualClock,
    pub handle: RuntimeHandle,
}

impl Harness {
    /// Start a runtime; must be called within a tokio runtime
    pub fn start(wearable: SimulatedWearable, link: LinkConfig) -> Self {
        Self::start_with_prefs(wearable, link, MemoryKeyValueStore::new())
    }

    pub fn start_with_prefs(
        wearable: SimulatedWearable,
        link: LinkConfig,
        prefs: MemoryKeyValueStore,
    ) -> Self {
        let wearable = Arc::new(wearable);
        let alerts = Arc::new(RecordingAlerter::new());
        let storage = Arc::new(MemoryPartitionStorage::new());
        let prefs = Arc::new(prefs);
        let clock = ManualClock::new(HARNESS_EPOCH);

        let handle = Runtime::start_with(RuntimeParts {
            link,
            storage: storage.clone(),
            prefs: prefs.clone(),
            clock: Arc::new(clock.clone()),
            transport: wearable.clone(),
            alerter: alerts.clone(),
        });

        Harness {
            wearable,
            alerts,
            storage,
            prefs,
            clock,
            handle,
        }
    }

    /// Poll `check` until it holds; `false` if it never does
    pub async fn wait_until(&self, mut check: impl FnMut(&Harness) -> bool) -> bool {
        for _ in 0..POLL_LIMIT {
            if check(self) {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }

    pub async fn wait_for_link(&self, state: LinkState) -> bool {
        self.wait_until(|h| h.handle.link_state() == state).await
    }
}
