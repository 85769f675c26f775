//! Records request frame
//!
//! Records request frame is 4 bytes:
//! - Bytes 0-1: Year (LE, unsigned)
//! - Byte 2: Month index (0-based)
//! - Byte 3: Day of month
//!
//! Asks the wearable to resend its history starting at the given UTC date.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use hrv_core::{DayKey, HrvError, HrvResult, SECS_PER_DAY};

/// Records request frame size in bytes
pub const RECORDS_REQUEST_SIZE: usize = 4;

/// History reference date sent to the wearable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordsRequest {
    pub year: u16,
    /// 0-based month index
    pub month0: u8,
    pub day: u8,
}

impl RecordsRequest {
    pub fn for_day(day: DayKey) -> Self {
        RecordsRequest {
            year: day.year().clamp(0, u16::MAX as i32) as u16,
            month0: day.month0() as u8,
            day: day.day() as u8,
        }
    }

    /// Reference date `days_back` UTC days before `now_unix`
    pub fn days_before(now_unix: i64, days_back: u32) -> HrvResult<Self> {
        let reference = now_unix - days_back as i64 * SECS_PER_DAY;
        Ok(Self::for_day(DayKey::from_unix_secs(reference)?))
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RECORDS_REQUEST_SIZE);
        buf.put_u16_le(self.year);
        buf.put_u8(self.month0);
        buf.put_u8(self.day);
        buf.freeze()
    }

    pub fn decode(buf: &[u8]) -> HrvResult<Self> {
        if buf.len() < RECORDS_REQUEST_SIZE {
            return Err(HrvError::MalformedFrame {
                frame: "records request",
                expected: RECORDS_REQUEST_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = &buf[..RECORDS_REQUEST_SIZE];
        Ok(RecordsRequest {
            year: cursor.get_u16_le(),
            month0: cursor.get_u8(),
            day: cursor.get_u8(),
        })
    }
}
