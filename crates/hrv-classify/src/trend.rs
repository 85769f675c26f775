//! Trend aggregation for history views
//!
//! Records in a timeframe are grouped into fixed buckets and averaged; each
//! bucket mean is banded against the trailing baseline so a view can
//! highlight readings that are out of range or drifting toward it.

use hrv_core::{mean_metric, DayKey, HrvResult, TelemetryRecord, SECS_PER_DAY};
use hrv_store::{RecordStore, BASELINE_LOOKBACK_SECS};

use crate::{is_fatigued, is_stressed, Thresholds};

/// Above `baseline * CAUTION_HIGH_RATIO` a value is drifting high
pub const CAUTION_HIGH_RATIO: f64 = 1.08;

/// Below `baseline * CAUTION_LOW_RATIO` a value is drifting low
pub const CAUTION_LOW_RATIO: f64 = 0.92;

/// History window a trend covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timeframe {
    /// Last hour in 5-minute buckets
    Hour,
    /// Last day in 2-hour buckets
    Day,
    /// Last week in UTC-day buckets
    Week,
}

impl Timeframe {
    pub fn lookback_secs(self) -> u64 {
        match self {
            Timeframe::Hour => 3600,
            Timeframe::Day => 24 * 3600,
            Timeframe::Week => 7 * 24 * 3600,
        }
    }

    pub fn bucket_secs(self) -> i64 {
        match self {
            Timeframe::Hour => 5 * 60,
            Timeframe::Day => 2 * 3600,
            Timeframe::Week => SECS_PER_DAY,
        }
    }

    /// Start of the bucket containing `timestamp`
    pub fn bucket_start(self, timestamp: i64) -> i64 {
        match self {
            Timeframe::Week => DayKey::from_unix_secs(timestamp)
                .map(DayKey::start_unix_secs)
                .unwrap_or_else(|_| timestamp - timestamp.rem_euclid(SECS_PER_DAY)),
            _ => timestamp - timestamp.rem_euclid(self.bucket_secs()),
        }
    }
}

/// Severity of one value against the baseline and thresholds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    /// Within 8% of baseline
    Steady,
    /// More than 8% off baseline but not classifiable
    Caution,
    /// Meets a stressed or fatigued rule
    Alert,
}

pub fn band(value: f64, baseline_mean: f64, thresholds: &Thresholds) -> Band {
    if is_stressed(value, baseline_mean, thresholds) || is_fatigued(value, baseline_mean, thresholds) {
        Band::Alert
    } else if value > CAUTION_HIGH_RATIO * baseline_mean || value < CAUTION_LOW_RATIO * baseline_mean {
        Band::Caution
    } else {
        Band::Steady
    }
}

/// Mean of one bucket
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendPoint {
    pub bucket_start: i64,
    pub mean: f64,
    pub count: usize,
}

/// Group records into buckets, ascending by bucket start
pub fn aggregate(records: &[TelemetryRecord], timeframe: Timeframe) -> Vec<TrendPoint> {
    let mut sorted: Vec<&TelemetryRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut points: Vec<TrendPoint> = Vec::new();
    let mut sum = 0.0;
    for record in sorted {
        let start = timeframe.bucket_start(record.unix_secs());
        match points.last_mut() {
            Some(point) if point.bucket_start == start => {
                sum += record.metric as f64;
                point.count += 1;
                point.mean = sum / point.count as f64;
            }
            _ => {
                sum = record.metric as f64;
                points.push(TrendPoint {
                    bucket_start: start,
                    mean: sum,
                    count: 1,
                });
            }
        }
    }
    points
}

/// Aggregated points with their bands
#[derive(Clone, Debug, PartialEq)]
pub struct TrendReport {
    pub timeframe: Timeframe,
    pub baseline_mean: Option<f64>,
    pub points: Vec<(TrendPoint, Band)>,
}

impl TrendReport {
    /// Build from explicit windows. Without a baseline no bands can be
    /// computed and the report is empty.
    pub fn from_records(
        timeframe: Timeframe,
        records: &[TelemetryRecord],
        baseline: &[TelemetryRecord],
        thresholds: &Thresholds,
    ) -> Self {
        let Some(baseline_mean) = mean_metric(baseline) else {
            return TrendReport {
                timeframe,
                baseline_mean: None,
                points: Vec::new(),
            };
        };

        let points = aggregate(records, timeframe)
            .into_iter()
            .map(|p| (p, band(p.mean, baseline_mean, thresholds)))
            .collect();

        TrendReport {
            timeframe,
            baseline_mean: Some(baseline_mean),
            points,
        }
    }

    /// Build from the store's current contents
    pub fn load(store: &RecordStore, timeframe: Timeframe, thresholds: &Thresholds) -> HrvResult<Self> {
        let records = store.query(timeframe.lookback_secs())?;
        let baseline = store.query(BASELINE_LOOKBACK_SECS)?;
        Ok(Self::from_records(timeframe, &records, &baseline, thresholds))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrv_core::ManualClock;
    use hrv_store::MemoryPartitionStorage;
    use std::sync::Arc;

    // 2023-11-14 22:13:20 UTC
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_bucket_starts() {
        assert_eq!(Timeframe::Hour.bucket_start(NOW), NOW - 200);
        assert_eq!(Timeframe::Day.bucket_start(NOW), NOW - 800);
        assert_eq!(Timeframe::Week.bucket_start(NOW), 1_699_920_000);
    }

    #[test]
    fn test_aggregate_means_per_bucket() {
        let records = [
            TelemetryRecord::new((NOW - 100) as u32, 60.0),
            TelemetryRecord::new((NOW - 150) as u32, 80.0),
            TelemetryRecord::new((NOW - 400) as u32, 50.0),
        ];
        let points = aggregate(&records, Timeframe::Hour);
        assert_eq!(
            points,
            vec![
                TrendPoint {
                    bucket_start: NOW - 500,
                    mean: 50.0,
                    count: 1,
                },
                TrendPoint {
                    bucket_start: NOW - 200,
                    mean: 70.0,
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn test_bands() {
        let t = Thresholds::default();
        assert_eq!(band(100.0, 100.0, &t), Band::Steady);
        assert_eq!(band(109.0, 105.0, &t), Band::Alert);
        assert_eq!(band(90.0, 100.0, &t), Band::Caution);
        assert_eq!(band(106.0, 97.0, &t), Band::Caution);
        assert_eq!(band(80.0, 100.0, &t), Band::Alert);
    }

    #[test]
    fn test_report_without_baseline_is_empty() {
        let report = TrendReport::from_records(
            Timeframe::Day,
            &[TelemetryRecord::new(NOW as u32, 70.0)],
            &[],
            &Thresholds::default(),
        );
        assert!(report.is_empty());
        assert_eq!(report.baseline_mean, None);
    }

    #[test]
    fn test_report_from_store() {
        let storage = Arc::new(MemoryPartitionStorage::new());
        let store = RecordStore::new(storage, Arc::new(ManualClock::new(NOW)));
        for (offset, metric) in [(10, 70.0), (20, 72.0), (2 * 24 * 3600, 70.0)] {
            store
                .append(&TelemetryRecord::new((NOW - offset) as u32, metric))
                .unwrap();
        }

        let report = TrendReport::load(&store, Timeframe::Hour, &Thresholds::default()).unwrap();
        assert_eq!(report.points.len(), 1);
        let (point, band) = report.points[0];
        assert_eq!(point.count, 2);
        assert_eq!(point.mean, 71.0);
        assert_eq!(band, Band::Steady);
    }
}
