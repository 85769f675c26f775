//! Connection manager - async driver for [`LinkMachine`]
//!
//! One manager owns one wearable link. It runs the discovery and connect
//! sequence, holds the link while it is up and feeds the machine on every
//! event. Disconnects arrive from the platform as epoch-tagged messages so a
//! callback from a replaced link cannot tear down the current one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use hrv_core::{Clock, HrvError, HrvResult, KeyValueStore};
use hrv_wire::RecordsRequest;

use crate::{
    Alert, Alerter, DeviceId, DisconnectSink, LinkAction, LinkConfig, LinkInput, LinkMachine,
    LinkState, NotificationSinks, PairingStore, Transition, WirelessTransport,
};

/// Clears a flag when dropped
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Receiving side of the two events that end a held link
struct Signals {
    lost: mpsc::UnboundedReceiver<u64>,
    reconnect: mpsc::Receiver<()>,
}

pub struct ConnectionManager {
    transport: Arc<dyn WirelessTransport>,
    pairing: PairingStore,
    clock: Arc<dyn Clock>,
    alerter: Arc<dyn Alerter>,
    sinks: NotificationSinks,
    config: LinkConfig,
    machine: parking_lot::Mutex<LinkMachine>,
    state_tx: watch::Sender<LinkState>,
    running: AtomicBool,
    connecting: AtomicBool,
    epoch: AtomicU64,
    lost_tx: mpsc::UnboundedSender<u64>,
    /// Capacity 1: at most one reconnect request is ever pending
    reconnect_tx: mpsc::Sender<()>,
    signals: AsyncMutex<Signals>,
}

impl ConnectionManager {
    pub fn new(
        config: LinkConfig,
        transport: Arc<dyn WirelessTransport>,
        prefs: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        alerter: Arc<dyn Alerter>,
        sinks: NotificationSinks,
    ) -> Self {
        let (state_tx, _) = watch::channel(LinkState::Idle);
        let (lost_tx, lost) = mpsc::unbounded_channel();
        let (reconnect_tx, reconnect) = mpsc::channel(1);

        ConnectionManager {
            transport,
            pairing: PairingStore::new(prefs),
            clock,
            alerter,
            sinks,
            machine: parking_lot::Mutex::new(LinkMachine::new(config.max_connect_attempts)),
            config,
            state_tx,
            running: AtomicBool::new(false),
            connecting: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            lost_tx,
            reconnect_tx,
            signals: AsyncMutex::new(Signals { lost, reconnect }),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.state_tx.subscribe()
    }

    /// Whether a discovery/connect sequence is in flight
    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Ask for an immediate reconnect.
    ///
    /// Dropped (returns `false`) while a connect sequence is running. Requests
    /// made before the manager gets to them collapse into one, and a connect
    /// sequence that starts for any reason discards whatever is pending.
    pub fn request_reconnect(&self) -> bool {
        if self.is_connecting() {
            debug!("connect in progress, reconnect request dropped");
            return false;
        }
        match self.reconnect_tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("reconnect already pending");
                true
            }
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Drive the link forever. A second concurrent call returns immediately.
    pub async fn run(self: Arc<Self>) {
        let Some(_running) = FlagGuard::acquire(&self.running) else {
            warn!("connection manager already running");
            return;
        };

        self.apply(LinkInput::Start);
        loop {
            match self.establish().await {
                Ok(epoch) => self.hold(epoch).await,
                Err(e) => {
                    warn!(error = %e, delay = ?self.config.restart_delay, "link sequence failed, restarting");
                    self.apply(LinkInput::Aborted);
                    let mut signals = self.signals.lock().await;
                    tokio::select! {
                        _ = sleep(self.config.restart_delay) => {}
                        _ = signals.reconnect.recv() => {
                            info!("reconnect requested during restart delay");
                        }
                    }
                    drop(signals);
                    self.apply(LinkInput::Start);
                }
            }
        }
    }

    fn apply(&self, input: LinkInput) -> Transition {
        let transition = self.machine.lock().step(input);
        if transition.from != transition.to {
            debug!(from = %transition.from, to = %transition.to, ?input, "link transition");
            self.state_tx.send_replace(transition.to);
        }
        transition
    }

    fn disconnect_sink(&self, epoch: u64) -> DisconnectSink {
        let lost = self.lost_tx.clone();
        Arc::new(move || {
            let _ = lost.send(epoch);
        })
    }

    async fn identify(&self) -> HrvResult<DeviceId> {
        if let Some(device) = self.pairing.load()? {
            debug!(%device, "using stored pairing");
            return Ok(device);
        }

        let device = self.transport.discover(self.config.service).await?;
        info!(%device, "device discovered");
        if let Err(e) = self.pairing.save(&device) {
            warn!(error = %e, %device, "pairing not persisted");
        }
        Ok(device)
    }

    /// Discover or recall a device, connect with bounded retries, subscribe
    /// and request the backfill. Returns the epoch of the live link.
    async fn establish(&self) -> HrvResult<u64> {
        let _connecting = FlagGuard::acquire(&self.connecting)
            .ok_or_else(|| HrvError::ConnectionFailure("connect already in progress".into()))?;
        self.discard_pending_reconnect().await;

        let (device, epoch) = 'pass: loop {
            let device = self.identify().await?;
            self.apply(LinkInput::Discovered);

            loop {
                let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
                match self
                    .transport
                    .connect(&device, self.disconnect_sink(epoch))
                    .await
                {
                    Ok(()) => break 'pass (device, epoch),
                    Err(e) => {
                        warn!(error = %e, %device, epoch, "connect attempt failed");
                        let transition = self.apply(LinkInput::ConnectFailed);
                        if transition.action == LinkAction::ClearPairing {
                            warn!(%device, "connect attempts exhausted, forgetting device");
                            self.pairing.clear()?;
                            continue 'pass;
                        }
                    }
                }
            }
        };

        self.apply(LinkInput::Connected);
        info!(%device, epoch, "link established");

        let config = &self.config;
        self.transport
            .subscribe(
                &device,
                config.service,
                config.telemetry_characteristic,
                self.sinks.telemetry.clone(),
            )
            .await?;
        self.transport
            .subscribe(
                &device,
                config.service,
                config.error_characteristic,
                self.sinks.errors.clone(),
            )
            .await?;

        let request = RecordsRequest::days_before(self.clock.now_unix(), config.backfill_days)?;
        self.transport
            .write(
                &device,
                config.service,
                config.request_characteristic,
                request.encode(),
            )
            .await?;
        debug!(?request, "backfill requested");

        self.alerter.alert(Alert::Connected);
        Ok(epoch)
    }

    /// This sequence serves any request made before it started
    async fn discard_pending_reconnect(&self) {
        let mut signals = self.signals.lock().await;
        if signals.reconnect.try_recv().is_ok() {
            debug!("pending reconnect absorbed by connect sequence");
        }
    }

    /// Wait until the link with `epoch` drops or a reconnect is requested.
    /// A drop that is already queued wins over a reconnect request.
    async fn hold(&self, epoch: u64) {
        let mut signals = self.signals.lock().await;
        let Signals { lost, reconnect } = &mut *signals;
        loop {
            tokio::select! {
                biased;

                dropped = lost.recv() => match dropped {
                    Some(dropped) if dropped == epoch => {
                        let transition = self.apply(LinkInput::LinkLost);
                        info!(epoch, "link lost");
                        if transition.action == LinkAction::NotifyDisconnected {
                            self.alerter.alert(Alert::Disconnected);
                        }
                        self.apply(LinkInput::Resume);
                        return;
                    }
                    Some(stale) => debug!(stale, epoch, "stale disconnect ignored"),
                    None => return,
                },
                _ = reconnect.recv() => {
                    info!(epoch, "manual reconnect");
                    self.apply(LinkInput::ReconnectRequested);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use hrv_core::{ManualClock, MemoryKeyValueStore, DEVICE_ID_KEY};
    use hrv_wire::GattId;

    use crate::{FrameSink, LogAlerter};

    const NOW: i64 = 1_700_000_000;

    #[derive(Default)]
    struct Recorded(parking_lot::Mutex<Vec<Alert>>);

    impl Alerter for Recorded {
        fn alert(&self, alert: Alert) {
            self.0.lock().push(alert);
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        fail_discovers: AtomicU32,
        fail_connects: AtomicU32,
        discovers: AtomicU32,
        connects: AtomicU32,
        subscribed: parking_lot::Mutex<Vec<GattId>>,
        writes: parking_lot::Mutex<Vec<(GattId, Bytes)>>,
        on_disconnect: parking_lot::Mutex<Option<DisconnectSink>>,
    }

    #[async_trait]
    impl WirelessTransport for FakeTransport {
        async fn discover(&self, _service: GattId) -> HrvResult<DeviceId> {
            self.discovers.fetch_add(1, Ordering::SeqCst);
            if self.fail_discovers.load(Ordering::SeqCst) > 0 {
                self.fail_discovers.fetch_sub(1, Ordering::SeqCst);
                return Err(HrvError::Transport("scan failed".into()));
            }
            Ok(DeviceId::new("wearable-1"))
        }

        async fn connect(&self, _device: &DeviceId, on_disconnect: DisconnectSink) -> HrvResult<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connects.load(Ordering::SeqCst) > 0 {
                self.fail_connects.fetch_sub(1, Ordering::SeqCst);
                return Err(HrvError::ConnectionFailure("out of range".into()));
            }
            *self.on_disconnect.lock() = Some(on_disconnect);
            Ok(())
        }

        async fn subscribe(
            &self,
            _device: &DeviceId,
            _service: GattId,
            characteristic: GattId,
            _sink: FrameSink,
        ) -> HrvResult<()> {
            self.subscribed.lock().push(characteristic);
            Ok(())
        }

        async fn write(
            &self,
            _device: &DeviceId,
            _service: GattId,
            characteristic: GattId,
            payload: Bytes,
        ) -> HrvResult<()> {
            self.writes.lock().push((characteristic, payload));
            Ok(())
        }
    }

    impl FakeTransport {
        fn drop_link(&self) {
            if let Some(sink) = self.on_disconnect.lock().clone() {
                sink();
            }
        }
    }

    fn manager(
        transport: Arc<FakeTransport>,
        prefs: Arc<MemoryKeyValueStore>,
    ) -> Arc<ConnectionManager> {
        let (sinks, _rx) = NotificationSinks::channels();
        Arc::new(ConnectionManager::new(
            LinkConfig::default(),
            transport,
            prefs,
            Arc::new(ManualClock::new(NOW)),
            Arc::new(LogAlerter),
            sinks,
        ))
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pairing_cleared_after_five_failures() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_connects.store(5, Ordering::SeqCst);
        let prefs = Arc::new(MemoryKeyValueStore::with_entries([(DEVICE_ID_KEY, "stale")]));
        let manager = manager(transport.clone(), prefs.clone());

        tokio::spawn(manager.clone().run());
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        assert_eq!(transport.connects.load(Ordering::SeqCst), 6);
        assert_eq!(transport.discovers.load(Ordering::SeqCst), 1);
        assert_eq!(prefs.get(DEVICE_ID_KEY).unwrap().as_deref(), Some("wearable-1"));
        assert_eq!(
            *transport.subscribed.lock(),
            vec![GattId(0x2A19), GattId(0x2A1A)]
        );

        let writes = transport.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, GattId(0x2A1B));
        assert_eq!(writes[0].1.as_ref(), &RecordsRequest::days_before(NOW, 7).unwrap().encode()[..]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_reuses_pairing() {
        let transport = Arc::new(FakeTransport::default());
        let prefs = Arc::new(MemoryKeyValueStore::new());
        let manager = manager(transport.clone(), prefs);

        tokio::spawn(manager.clone().run());
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        transport.drop_link();
        let (m, t) = (manager.clone(), transport.clone());
        wait_until(move || {
            t.connects.load(Ordering::SeqCst) == 2 && m.state() == LinkState::Subscribed
        })
        .await;
        assert_eq!(transport.discovers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reconnect_and_stale_disconnect() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager(transport.clone(), Arc::new(MemoryKeyValueStore::new()));

        tokio::spawn(manager.clone().run());
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        let old_sink = transport.on_disconnect.lock().clone().unwrap();
        assert!(manager.request_reconnect());
        let t = transport.clone();
        wait_until(move || t.connects.load(Ordering::SeqCst) == 2).await;
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        old_sink();
        sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), LinkState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sequence_restarts_after_delay() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_discovers.store(1, Ordering::SeqCst);
        let manager = manager(transport.clone(), Arc::new(MemoryKeyValueStore::new()));

        tokio::spawn(manager.clone().run());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(manager.state(), LinkState::Idle);
        assert_eq!(transport.discovers.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(28)).await;
        assert_eq!(transport.discovers.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.discovers.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), LinkState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_before_sequence_is_absorbed() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager(transport.clone(), Arc::new(MemoryKeyValueStore::new()));

        assert!(manager.request_reconnect());
        assert!(manager.request_reconnect());
        tokio::spawn(manager.clone().run());
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), LinkState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_drop_wins_over_reconnect() {
        let transport = Arc::new(FakeTransport::default());
        let alerts = Arc::new(Recorded::default());
        let (sinks, _rx) = NotificationSinks::channels();
        let manager = Arc::new(ConnectionManager::new(
            LinkConfig::default(),
            transport.clone(),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(ManualClock::new(NOW)),
            alerts.clone(),
            sinks,
        ));

        tokio::spawn(manager.clone().run());
        let m = manager.clone();
        wait_until(move || m.state() == LinkState::Subscribed).await;

        transport.drop_link();
        assert!(manager.request_reconnect());
        let t = transport.clone();
        wait_until(move || t.connects.load(Ordering::SeqCst) == 2).await;
        sleep(Duration::from_secs(5)).await;

        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), LinkState::Subscribed);
        assert_eq!(
            alerts.0.lock().iter().filter(|a| **a == Alert::Disconnected).count(),
            1
        );
    }

    #[test]
    fn test_reconnect_dropped_while_connecting() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager(transport, Arc::new(MemoryKeyValueStore::new()));

        let guard = FlagGuard::acquire(&manager.connecting).unwrap();
        assert!(!manager.request_reconnect());
        drop(guard);
        assert!(manager.request_reconnect());
        assert!(manager.request_reconnect());
    }
}
