use crate::grammar::Measurement;
use chrono::{Local, NaiveDateTime, Timelike};

/// Fixed timestamp layout used in the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A measurement stamped with the local wall-clock time it was extracted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    pub measurement: Measurement,
}

impl Record {
    /// Builds a record for a known capture time, dropping sub-second precision.
    pub fn at(timestamp: NaiveDateTime, measurement: Measurement) -> Self {
        let timestamp = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        Self {
            timestamp,
            measurement,
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Cells in header order, timestamp first.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(4);
        row.push(self.formatted_timestamp());
        row.extend(self.measurement.fields());
        row
    }
}

/// Stamps `measurement` with the current local time.
pub fn stamp(measurement: Measurement) -> Record {
    Record::at(Local::now().naive_local(), measurement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Distance;
    use chrono::NaiveDate;

    fn summary() -> Measurement {
        Measurement::Summary {
            rtt_ns: 500,
            distance: Distance::from_centimeters(1207),
        }
    }

    #[test]
    fn record_row_starts_with_second_resolution_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 750)
            .unwrap();
        let record = Record::at(ts, summary());
        assert_eq!(record.to_row(), vec!["2024-01-01 12:00:00", "500", "12.07"]);
    }

    #[test]
    fn stamp_uses_current_local_time() {
        let before = Local::now().naive_local().with_nanosecond(0).unwrap();
        let record = stamp(summary());
        let after = Local::now().naive_local();
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= after);
        assert_eq!(record.timestamp.nanosecond(), 0);
    }
}
