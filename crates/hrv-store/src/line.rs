//! Partition line format
//!
//! Each record is one line: `"{timestamp} {metric}\n"`, the metric with
//! exactly two decimals, left-padded with `0` to a width of six characters.
//! Two records are duplicates only if their lines are byte-identical.

use hrv_core::{HrvError, HrvResult, TelemetryRecord};

/// Width the metric field is padded to
pub const METRIC_WIDTH: usize = 6;

/// Render a metric with two decimals, padded to [`METRIC_WIDTH`].
///
/// Exact halfway cases round away from zero so files stay byte-compatible
/// with the ones the companion app already wrote.
pub fn format_metric(metric: f32) -> String {
    // f32 * 100 is exact in f64: 24-bit mantissa times a 7-bit constant.
    let value = if metric == 0.0 { 0.0 } else { metric as f64 };
    let scaled = value * 100.0;

    let body = if scaled.fract().abs() == 0.5 {
        let hundredths = scaled.abs().ceil() as u64;
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, hundredths / 100, hundredths % 100)
    } else {
        format!("{:.2}", value)
    };

    format!("{:0>width$}", body, width = METRIC_WIDTH)
}

/// Serialize a record into its partition line, newline included
pub fn format_line(record: &TelemetryRecord) -> HrvResult<String> {
    if !record.metric.is_finite() {
        return Err(HrvError::InvalidRecord(format!(
            "non-finite metric {} at {}",
            record.metric, record.timestamp
        )));
    }
    Ok(format!("{} {}\n", record.timestamp, format_metric(record.metric)))
}

/// Parse one partition line (without its newline)
pub fn parse_line(line: &str) -> HrvResult<TelemetryRecord> {
    let mut fields = line.split(' ');
    let (Some(ts), Some(metric), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(HrvError::InvalidRecord(format!("bad field count: {:?}", line)));
    };

    let timestamp = ts
        .parse::<u32>()
        .map_err(|e| HrvError::InvalidRecord(format!("timestamp {:?}: {}", ts, e)))?;
    let metric = metric
        .parse::<f32>()
        .map_err(|e| HrvError::InvalidRecord(format!("metric {:?}: {}", metric, e)))?;

    if !metric.is_finite() {
        return Err(HrvError::InvalidRecord(format!("non-finite metric {:?}", line)));
    }

    Ok(TelemetryRecord { timestamp, metric })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line(&TelemetryRecord::new(1_700_000_000, 55.25)).unwrap();
        assert_eq!(line, "1700000000 055.25\n");
    }

    #[test]
    fn test_metric_padding() {
        assert_eq!(format_metric(5.5), "005.50");
        assert_eq!(format_metric(0.0), "000.00");
        assert_eq!(format_metric(-0.0), "000.00");
        assert_eq!(format_metric(123.456), "123.46");
        assert_eq!(format_metric(1234.5), "1234.50");
    }

    #[test]
    fn test_halfway_rounds_up() {
        assert_eq!(format_metric(0.125), "000.13");
        assert_eq!(format_metric(55.125), "055.13");
        assert_eq!(format_metric(2.375), "002.38");
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(format_line(&TelemetryRecord::new(1, f32::NAN)).is_err());
        assert!(format_line(&TelemetryRecord::new(1, f32::INFINITY)).is_err());
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("1700000000 055.25").unwrap(),
            TelemetryRecord::new(1_700_000_000, 55.25)
        );
        assert!(parse_line("").is_err());
        assert!(parse_line("1700000000").is_err());
        assert!(parse_line("1700000000 055.25 extra").is_err());
        assert!(parse_line("-5 010.00").is_err());
        assert!(parse_line("12 abc").is_err());
        assert!(parse_line("12 NaN").is_err());
    }
}
