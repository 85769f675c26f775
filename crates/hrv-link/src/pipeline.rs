//! Telemetry ingestion: decode, persist, reclassify, alert on change

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use hrv_classify::{classify, Thresholds};
use hrv_core::{ClassificationState, HrvResult, KeyValueStore, TelemetryRecord};
use hrv_store::{AppendOutcome, RecordStore};
use hrv_wire::decode_telemetry;

use crate::{Alert, Alerter};

/// Result of ingesting one telemetry frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ingested {
    pub record: TelemetryRecord,
    pub append: AppendOutcome,
    pub state: ClassificationState,
    pub changed: bool,
}

/// Owns the current classification and feeds it from telemetry frames
pub struct TelemetryPipeline {
    store: Arc<RecordStore>,
    prefs: Arc<dyn KeyValueStore>,
    alerter: Arc<dyn Alerter>,
    state_tx: watch::Sender<ClassificationState>,
}

impl TelemetryPipeline {
    pub fn new(
        store: Arc<RecordStore>,
        prefs: Arc<dyn KeyValueStore>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ClassificationState::default());
        TelemetryPipeline {
            store,
            prefs,
            alerter,
            state_tx,
        }
    }

    pub fn state(&self) -> ClassificationState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ClassificationState> {
        self.state_tx.subscribe()
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Ingest one raw notification payload
    pub fn handle_frame(&mut self, payload: &[u8]) -> HrvResult<Ingested> {
        let record = decode_telemetry(payload)?;
        let append = self.store.append(&record)?;
        debug!(timestamp = record.timestamp, metric = record.metric, ?append, "telemetry stored");

        let (state, changed) = self.recompute()?;
        Ok(Ingested {
            record,
            append,
            state,
            changed,
        })
    }

    /// Reclassify from the store; an empty window keeps the previous state
    pub fn recompute(&mut self) -> HrvResult<(ClassificationState, bool)> {
        let sample = self.store.sample_window()?;
        let baseline = self.store.baseline_window()?;
        let thresholds = Thresholds::load(self.prefs.as_ref());

        let previous = self.state();
        let Some(next) = classify(&sample, &baseline, &thresholds) else {
            debug!(
                sample = sample.len(),
                baseline = baseline.len(),
                "insufficient data, classification kept"
            );
            return Ok((previous, false));
        };

        if next == previous {
            return Ok((previous, false));
        }

        info!(from = %previous, to = %next, "classification changed");
        self.state_tx.send_replace(next);
        self.alerter.alert(Alert::StateChanged(next));
        Ok((next, true))
    }

    /// Consume telemetry notifications until the channel closes. Failures
    /// drop the offending frame.
    pub async fn run(mut self, mut frames: mpsc::UnboundedReceiver<Bytes>) {
        while let Some(payload) = frames.recv().await {
            if let Err(e) = self.handle_frame(&payload) {
                warn!(error = %e, len = payload.len(), "telemetry frame dropped");
            }
        }
        debug!("telemetry channel closed");
    }
}
