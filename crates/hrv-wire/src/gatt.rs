//! GATT service and characteristic identifiers
//!
//! The wearable exposes one service with three characteristics. Ids are
//! 16-bit short forms of the Bluetooth base UUID.

use std::fmt;

/// Telemetry service
pub const HRV_SERVICE: GattId = GattId(0x180F);
/// Notifies telemetry frames
pub const HRV_CHARACTERISTIC: GattId = GattId(0x2A19);
/// Notifies error frames
pub const ERROR_CHARACTERISTIC: GattId = GattId(0x2A1A);
/// Accepts records request frames
pub const REQUEST_CHARACTERISTIC: GattId = GattId(0x2A1B);

/// 16-bit GATT service or characteristic id
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GattId(pub u16);

impl GattId {
    #[inline]
    pub fn new(id: u16) -> Self {
        GattId(id)
    }

    /// Full 128-bit UUID string on the Bluetooth base UUID
    pub fn to_uuid_string(self) -> String {
        format!("0000{:04x}-0000-1000-8000-00805f9b34fb", self.0)
    }
}

impl fmt::Debug for GattId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gatt({:#06x})", self.0)
    }
}

impl fmt::Display for GattId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_expansion() {
        assert_eq!(
            HRV_SERVICE.to_uuid_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(format!("{:?}", ERROR_CHARACTERISTIC), "Gatt(0x2a1a)");
    }
}
