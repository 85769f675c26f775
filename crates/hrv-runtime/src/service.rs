//! Component wiring and the running service handle

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use hrv_classify::{Thresholds, Timeframe, TrendReport};
use hrv_core::{
    ClassificationState, Clock, HrvResult, JsonFileKeyValueStore, KeyValueStore, SystemClock,
};
use hrv_link::{
    Alerter, ConnectionManager, ErrorBurstMonitor, GatedAlerter, LinkConfig, LinkState,
    NotificationSinks, TelemetryPipeline, WirelessTransport,
};
use hrv_store::{FsPartitionStorage, PartitionStorage, RecordStore};

use crate::RuntimeConfig;

/// Everything the service needs, already constructed
pub struct RuntimeParts {
    pub link: LinkConfig,
    pub storage: Arc<dyn PartitionStorage>,
    pub prefs: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn WirelessTransport>,
    pub alerter: Arc<dyn Alerter>,
}

pub struct Runtime;

impl Runtime {
    /// Open the on-disk stores named by `config` and start the service.
    /// Alerts pass through the user's notification switch.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(
        config: &RuntimeConfig,
        transport: Arc<dyn WirelessTransport>,
        alerter: Arc<dyn Alerter>,
    ) -> HrvResult<RuntimeHandle> {
        let prefs: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileKeyValueStore::open(&config.preferences_file)?);
        let gated: Arc<dyn Alerter> = Arc::new(GatedAlerter::new(alerter, prefs.clone()));

        info!(
            data_dir = %config.data_dir.display(),
            preferences = %config.preferences_file.display(),
            "starting hrv runtime"
        );

        Ok(Self::start_with(RuntimeParts {
            link: config.link_config(),
            storage: Arc::new(FsPartitionStorage::new(&config.data_dir)),
            prefs,
            clock: Arc::new(SystemClock),
            transport,
            alerter: gated,
        }))
    }

    /// Start the service from prebuilt parts. Must be called within a tokio
    /// runtime.
    pub fn start_with(parts: RuntimeParts) -> RuntimeHandle {
        let RuntimeParts {
            link,
            storage,
            prefs,
            clock,
            transport,
            alerter,
        } = parts;

        let store = Arc::new(RecordStore::new(storage, clock.clone()));
        let (sinks, receivers) = NotificationSinks::channels();

        let pipeline = TelemetryPipeline::new(store.clone(), prefs.clone(), alerter.clone());
        let classification = pipeline.subscribe_state();
        let monitor = ErrorBurstMonitor::new(&link, alerter.clone());
        let manager = Arc::new(ConnectionManager::new(
            link, transport, prefs.clone(), clock, alerter, sinks,
        ));

        let tasks = vec![
            tokio::spawn(pipeline.run(receivers.telemetry)),
            tokio::spawn(monitor.run(receivers.errors)),
            tokio::spawn(manager.clone().run()),
        ];
        debug!(tasks = tasks.len(), "runtime tasks spawned");

        RuntimeHandle {
            manager,
            store,
            prefs,
            classification,
            tasks,
        }
    }
}

/// Handle to a running service; dropping it leaves the tasks running
pub struct RuntimeHandle {
    manager: Arc<ConnectionManager>,
    store: Arc<RecordStore>,
    prefs: Arc<dyn KeyValueStore>,
    classification: watch::Receiver<ClassificationState>,
    tasks: Vec<JoinHandle<()>>,
}

impl RuntimeHandle {
    /// Explicit "reconnect now"; `false` if a connect is already running
    pub fn reconnect(&self) -> bool {
        self.manager.request_reconnect()
    }

    pub fn state(&self) -> watch::Receiver<LinkState> {
        self.manager.subscribe_state()
    }

    pub fn link_state(&self) -> LinkState {
        self.manager.state()
    }

    pub fn classification(&self) -> watch::Receiver<ClassificationState> {
        self.classification.clone()
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn preferences(&self) -> &Arc<dyn KeyValueStore> {
        &self.prefs
    }

    /// History view over the store with the current thresholds
    pub fn trend(&self, timeframe: Timeframe) -> HrvResult<TrendReport> {
        let thresholds = Thresholds::load(self.prefs.as_ref());
        TrendReport::load(&self.store, timeframe, &thresholds)
    }

    /// Stop every task and wait for them to finish
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        info!("hrv runtime stopped");
    }
}
