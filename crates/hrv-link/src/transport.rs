//! Platform wireless transport port
//!
//! The platform stack below characteristic read/write is external. The link
//! drives it through [`WirelessTransport`] and receives notifications through
//! two named sinks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use hrv_core::HrvResult;
use hrv_wire::GattId;

/// Opaque platform identity of a wearable
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        DeviceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives raw notification payloads from one characteristic
pub type FrameSink = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Invoked by the platform when an established link drops
pub type DisconnectSink = Arc<dyn Fn() + Send + Sync>;

#[async_trait]
pub trait WirelessTransport: Send + Sync {
    /// Locate a device advertising `service`. May block until resolved.
    async fn discover(&self, service: GattId) -> HrvResult<DeviceId>;

    /// Open a channel to `device`; `on_disconnect` fires when it drops
    async fn connect(&self, device: &DeviceId, on_disconnect: DisconnectSink) -> HrvResult<()>;

    /// Start notifications on a characteristic
    async fn subscribe(
        &self,
        device: &DeviceId,
        service: GattId,
        characteristic: GattId,
        sink: FrameSink,
    ) -> HrvResult<()>;

    /// Write a payload to a characteristic
    async fn write(
        &self,
        device: &DeviceId,
        service: GattId,
        characteristic: GattId,
        payload: Bytes,
    ) -> HrvResult<()>;
}

/// The two notification sinks registered on every link
#[derive(Clone)]
pub struct NotificationSinks {
    pub telemetry: FrameSink,
    pub errors: FrameSink,
}

/// Receiving ends of [`NotificationSinks::channels`]
pub struct NotificationReceivers {
    pub telemetry: mpsc::UnboundedReceiver<Bytes>,
    pub errors: mpsc::UnboundedReceiver<Bytes>,
}

impl NotificationSinks {
    pub fn new(telemetry: FrameSink, errors: FrameSink) -> Self {
        NotificationSinks { telemetry, errors }
    }

    /// Sinks that forward into one channel per characteristic, keeping
    /// delivery order per characteristic
    pub fn channels() -> (Self, NotificationReceivers) {
        let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let sinks = NotificationSinks {
            telemetry: Arc::new(move |frame: Bytes| {
                if telemetry_tx.send(frame).is_err() {
                    tracing::debug!("telemetry receiver gone, frame dropped");
                }
            }),
            errors: Arc::new(move |frame: Bytes| {
                if errors_tx.send(frame).is_err() {
                    tracing::debug!("error receiver gone, frame dropped");
                }
            }),
        };

        (
            sinks,
            NotificationReceivers {
                telemetry: telemetry_rx,
                errors: errors_rx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sinks_keep_order() {
        let (sinks, mut rx) = NotificationSinks::channels();
        (sinks.telemetry)(Bytes::from_static(&[1]));
        (sinks.errors)(Bytes::from_static(&[9]));
        (sinks.telemetry)(Bytes::from_static(&[2]));

        assert_eq!(rx.telemetry.recv().await.unwrap().as_ref(), &[1]);
        assert_eq!(rx.telemetry.recv().await.unwrap().as_ref(), &[2]);
        assert_eq!(rx.errors.recv().await.unwrap().as_ref(), &[9]);
    }

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::new("C0:FF:EE:00:11:22");
        assert_eq!(id.to_string(), "C0:FF:EE:00:11:22");
        assert_eq!(format!("{:?}", id), "Device(C0:FF:EE:00:11:22)");
    }
}
