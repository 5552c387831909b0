use crate::grammar::Measurement;
use crate::record::Record;
use log::{debug, info};

/// Operator-facing console reporting for the ingestion loop.
pub struct LogManager {
    echo_lines: bool,
}

impl LogManager {
    pub fn new(echo_lines: bool) -> Self {
        Self { echo_lines }
    }

    /// Reports a raw device line as it arrives.
    pub fn record_line(&self, line: &str) {
        if self.echo_lines {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
    }

    pub fn record_unmatched(&self, line: &str) {
        debug!("no measurement in line: {}", line);
    }

    pub fn record_write(&self, record: &Record) {
        info!("Write: {}", describe(record));
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(true)
    }
}

fn describe(record: &Record) -> String {
    let ts = record.formatted_timestamp();
    match &record.measurement {
        Measurement::Session {
            raw_rtt_ns,
            est_rtt_ns,
            distance,
        } => format!(
            "{}, RTT_raw: {}, RTT_est: {}, Distance: {} m",
            ts, raw_rtt_ns, est_rtt_ns, distance
        ),
        Measurement::Summary { rtt_ns, distance } => {
            format!("{}, RTT: {}, Distance: {} m", ts, rtt_ns, distance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Distance;
    use chrono::NaiveDate;

    #[test]
    fn write_description_names_every_field() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let record = Record::at(
            ts,
            Measurement::Session {
                raw_rtt_ns: 120,
                est_rtt_ns: 110,
                distance: Distance::from_centimeters(314),
            },
        );
        assert_eq!(
            describe(&record),
            "2024-01-01 12:00:00, RTT_raw: 120, RTT_est: 110, Distance: 3.14 m"
        );
    }
}
