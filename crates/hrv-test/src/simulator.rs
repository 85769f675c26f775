//! Simulated wearable for link and ingestion testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::debug;

use hrv_core::{ErrorFrame, HrvError, HrvResult, TelemetryRecord};
use hrv_link::{DeviceId, DisconnectSink, FrameSink, WirelessTransport};
use hrv_wire::{
    encode_error, encode_telemetry, GattId, ERROR_CHARACTERISTIC, HRV_CHARACTERISTIC,
};

/// Live channel state
#[derive(Default)]
struct Link {
    connected: bool,
    on_disconnect: Option<DisconnectSink>,
    sinks: HashMap<GattId, FrameSink>,
}

/// A wearable that answers the transport port in-process.
///
/// Failures are scripted by count: the next `n` discover or connect calls
/// fail, later ones succeed. Connects can be held open with a gate to
/// observe the manager mid-sequence.
pub struct SimulatedWearable {
    device: DeviceId,
    discover_failures: AtomicU32,
    connect_failures: AtomicU32,
    discovers: AtomicU32,
    connects: AtomicU32,
    link: Mutex<Link>,
    writes: Mutex<Vec<(GattId, Bytes)>>,
    gate: watch::Sender<bool>,
    rng: Mutex<StdRng>,
}

impl SimulatedWearable {
    pub fn new() -> Self {
        Self::with_device(DeviceId::new("SIM-WEARABLE-01"))
    }

    pub fn with_device(device: DeviceId) -> Self {
        let (gate, _) = watch::channel(true);
        SimulatedWearable {
            device,
            discover_failures: AtomicU32::new(0),
            connect_failures: AtomicU32::new(0),
            discovers: AtomicU32::new(0),
            connects: AtomicU32::new(0),
            link: Mutex::new(Link::default()),
            writes: Mutex::new(Vec::new()),
            gate,
            rng: Mutex::new(StdRng::seed_from_u64(0x4852_5600)),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Make the next `n` discover calls fail
    pub fn fail_discovers(&self, n: u32) {
        self.discover_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` connect calls fail
    pub fn fail_connects(&self, n: u32) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Hold connect calls until [`Self::release_connects`]
    pub fn hold_connects(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_connects(&self) {
        self.gate.send_replace(true);
    }

    pub fn discover_count(&self) -> u32 {
        self.discovers.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().connected
    }

    pub fn is_subscribed(&self, characteristic: GattId) -> bool {
        self.link.lock().sinks.contains_key(&characteristic)
    }

    pub fn writes(&self) -> Vec<(GattId, Bytes)> {
        self.writes.lock().clone()
    }

    /// Notify on a characteristic; `false` if nobody is subscribed
    pub fn notify(&self, characteristic: GattId, payload: Bytes) -> bool {
        let sink = self.link.lock().sinks.get(&characteristic).cloned();
        match sink {
            Some(sink) => {
                sink(payload);
                true
            }
            None => false,
        }
    }

    pub fn send_reading(&self, record: &TelemetryRecord) -> bool {
        self.notify(HRV_CHARACTERISTIC, encode_telemetry(record))
    }

    pub fn send_error(&self, code: u8) -> bool {
        let frame = encode_error(ErrorFrame::new(code));
        self.notify(ERROR_CHARACTERISTIC, Bytes::copy_from_slice(&frame))
    }

    /// A plausible resting reading at `timestamp`
    pub fn random_reading(&self, timestamp: u32) -> TelemetryRecord {
        let metric = self.rng.lock().gen_range(20.0f32..120.0);
        TelemetryRecord::new(timestamp, (metric * 100.0).round() / 100.0)
    }

    /// Drop the link as if the device went out of range
    pub fn disconnect(&self) {
        let on_disconnect = {
            let mut link = self.link.lock();
            link.connected = false;
            link.sinks.clear();
            link.on_disconnect.take()
        };
        if let Some(on_disconnect) = on_disconnect {
            debug!(device = %self.device, "simulated disconnect");
            on_disconnect();
        }
    }

    fn require_link(&self, device: &DeviceId) -> HrvResult<()> {
        if device != &self.device || !self.link.lock().connected {
            return Err(HrvError::Transport(format!("{} not connected", device)));
        }
        Ok(())
    }
}

impl Default for SimulatedWearable {
    fn default() -> Self {
        Self::new()
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl WirelessTransport for SimulatedWearable {
    async fn discover(&self, service: GattId) -> HrvResult<DeviceId> {
        self.discovers.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.discover_failures) {
            return Err(HrvError::Transport(format!("no device advertising {}", service)));
        }
        Ok(self.device.clone())
    }

    async fn connect(&self, device: &DeviceId, on_disconnect: DisconnectSink) -> HrvResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(HrvError::ConnectionFailure("simulator gone".into()));
        }

        if take_failure(&self.connect_failures) {
            return Err(HrvError::ConnectionFailure(format!("{} out of range", device)));
        }
        if device != &self.device {
            return Err(HrvError::ConnectionFailure(format!("unknown device {}", device)));
        }

        let mut link = self.link.lock();
        link.connected = true;
        link.sinks.clear();
        link.on_disconnect = Some(on_disconnect);
        Ok(())
    }

    async fn subscribe(
        &self,
        device: &DeviceId,
        _service: GattId,
        characteristic: GattId,
        sink: FrameSink,
    ) -> HrvResult<()> {
        self.require_link(device)?;
        self.link.lock().sinks.insert(characteristic, sink);
        Ok(())
    }

    async fn write(
        &self,
        device: &DeviceId,
        _service: GattId,
        characteristic: GattId,
        payload: Bytes,
    ) -> HrvResult<()> {
        self.require_link(device)?;
        self.writes.lock().push((characteristic, payload));
        Ok(())
    }
}
