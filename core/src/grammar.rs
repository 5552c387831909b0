use crate::prelude::IngestResult;
use log::debug;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SESSION_PATTERN: &str = r"FTM Data: Raw RTT = (?P<raw>\d+) nSec, Est RTT = (?P<est>\d+) nSec, Distance = (?P<whole>\d+)\.(?P<frac>\d{2}) meters";
const SUMMARY_PATTERN: &str = r"FTM session complete\. Estimated RTT - (?P<rtt>\d+) nSec, Estimated Distance - (?P<whole>\d+)\.(?P<frac>\d{2}) meters";

/// Message shape selected for a run.
///
/// Only one grammar is active at a time; it fixes both the pattern lines are
/// matched against and the column set of the output log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Per-burst report with raw and estimated RTT.
    #[default]
    Session,
    /// Terminal "session complete" report with the estimated RTT only.
    Summary,
}

impl Grammar {
    pub fn name(self) -> &'static str {
        match self {
            Grammar::Session => "session",
            Grammar::Summary => "summary",
        }
    }

    /// Column names of the CSV header row.
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Grammar::Session => &[
                "Timestamp",
                "RTT_raw (nSec)",
                "RTT_est",
                "Distance (meters)",
            ],
            Grammar::Summary => &["Timestamp", "RTT (nSec)", "Distance (meters)"],
        }
    }

    pub fn pattern(self) -> &'static str {
        match self {
            Grammar::Session => SESSION_PATTERN,
            Grammar::Summary => SUMMARY_PATTERN,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown grammar '{0}', expected 'session' or 'summary'")]
pub struct ParseGrammarError(String);

impl FromStr for Grammar {
    type Err = ParseGrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Grammar::Session),
            "summary" => Ok(Grammar::Summary),
            other => Err(ParseGrammarError(other.to_string())),
        }
    }
}

/// Distance in meters with exactly two fractional digits, held as centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance {
    centimeters: u64,
}

impl Distance {
    pub fn from_centimeters(centimeters: u64) -> Self {
        Self { centimeters }
    }

    /// Rebuilds `whole.frac` from its captured digit strings.
    ///
    /// `frac` must be exactly two ASCII digits. Returns `None` when either
    /// part is malformed or the value does not fit.
    pub fn from_parts(whole: &str, frac: &str) -> Option<Self> {
        if frac.len() != 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let whole: u64 = whole.parse().ok()?;
        let frac: u64 = frac.parse().ok()?;
        let centimeters = whole.checked_mul(100)?.checked_add(frac)?;
        Some(Self { centimeters })
    }

    pub fn centimeters(self) -> u64 {
        self.centimeters
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.centimeters / 100, self.centimeters % 100)
    }
}

/// Typed values decoded from one matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Session {
        raw_rtt_ns: u64,
        est_rtt_ns: u64,
        distance: Distance,
    },
    Summary {
        rtt_ns: u64,
        distance: Distance,
    },
}

impl Measurement {
    pub fn grammar(&self) -> Grammar {
        match self {
            Measurement::Session { .. } => Grammar::Session,
            Measurement::Summary { .. } => Grammar::Summary,
        }
    }

    pub fn distance(&self) -> Distance {
        match *self {
            Measurement::Session { distance, .. } | Measurement::Summary { distance, .. } => {
                distance
            }
        }
    }

    /// Values in header order, without the timestamp column.
    pub fn fields(&self) -> Vec<String> {
        match self {
            Measurement::Session {
                raw_rtt_ns,
                est_rtt_ns,
                distance,
            } => vec![
                raw_rtt_ns.to_string(),
                est_rtt_ns.to_string(),
                distance.to_string(),
            ],
            Measurement::Summary { rtt_ns, distance } => {
                vec![rtt_ns.to_string(), distance.to_string()]
            }
        }
    }
}

/// Compiled matcher for one grammar.
#[derive(Debug, Clone)]
pub struct Extractor {
    grammar: Grammar,
    pattern: Regex,
}

impl Extractor {
    pub fn new(grammar: Grammar) -> IngestResult<Self> {
        let pattern = Regex::new(grammar.pattern())?;
        Ok(Self { grammar, pattern })
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Searches `line` for the grammar's phrase.
    ///
    /// Unrelated text before or after the phrase is allowed. `None` means the
    /// line carries no measurement, which is the common case.
    pub fn extract(&self, line: &str) -> Option<Measurement> {
        let caps = self.pattern.captures(line)?;
        match self.grammar {
            Grammar::Session => Some(Measurement::Session {
                raw_rtt_ns: parse_u64(&caps, "raw")?,
                est_rtt_ns: parse_u64(&caps, "est")?,
                distance: parse_distance(&caps)?,
            }),
            Grammar::Summary => Some(Measurement::Summary {
                rtt_ns: parse_u64(&caps, "rtt")?,
                distance: parse_distance(&caps)?,
            }),
        }
    }
}

fn parse_u64(caps: &Captures<'_>, name: &str) -> Option<u64> {
    let value = caps.name(name)?.as_str();
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!("capture '{}' out of range: {}", name, value);
            None
        }
    }
}

fn parse_distance(caps: &Captures<'_>) -> Option<Distance> {
    let whole = caps.name("whole")?.as_str();
    let frac = caps.name("frac")?.as_str();
    let distance = Distance::from_parts(whole, frac);
    if distance.is_none() {
        debug!("distance {}.{} out of range", whole, frac);
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION_LINE: &str =
        "FTM Data: Raw RTT = 120 nSec, Est RTT = 110 nSec, Distance = 3.14 meters";
    const SUMMARY_LINE: &str =
        "FTM session complete. Estimated RTT - 500 nSec, Estimated Distance - 12.07 meters";

    #[test]
    fn session_line_is_decoded() {
        let extractor = Extractor::new(Grammar::Session).unwrap();
        let measurement = extractor.extract(SESSION_LINE).unwrap();
        assert_eq!(
            measurement,
            Measurement::Session {
                raw_rtt_ns: 120,
                est_rtt_ns: 110,
                distance: Distance::from_centimeters(314),
            }
        );
        assert_eq!(measurement.fields(), vec!["120", "110", "3.14"]);
    }

    #[test]
    fn summary_line_is_decoded() {
        let extractor = Extractor::new(Grammar::Summary).unwrap();
        let measurement = extractor.extract(SUMMARY_LINE).unwrap();
        assert_eq!(measurement.fields(), vec!["500", "12.07"]);
    }

    #[test]
    fn device_log_prefix_is_tolerated() {
        let extractor = Extractor::new(Grammar::Summary).unwrap();
        let line = format!("I (52731) ftm_station: {}\u{1b}[0m", SUMMARY_LINE);
        assert!(extractor.extract(&line).is_some());
    }

    #[test]
    fn grammars_do_not_cross_match() {
        let session = Extractor::new(Grammar::Session).unwrap();
        let summary = Extractor::new(Grammar::Summary).unwrap();
        assert!(session.extract(SUMMARY_LINE).is_none());
        assert!(summary.extract(SESSION_LINE).is_none());
    }

    #[test]
    fn loose_text_does_not_match() {
        let extractor = Extractor::new(Grammar::Session).unwrap();
        assert!(extractor.extract("garbage noise").is_none());
        assert!(extractor
            .extract("FTM Data: RTT = 120 nSec, Distance = 3.14 meters")
            .is_none());
        assert!(extractor
            .extract("FTM Data: Raw RTT = 120 nSec, Est RTT = 110 nSec, Distance = 3.1 meters")
            .is_none());
        assert!(extractor
            .extract("FTM Data: Raw RTT = 120 nSec, Est RTT = 110 nSec, Distance = 3.141 meters")
            .is_none());
    }

    #[test]
    fn overflowing_capture_is_no_match() {
        let extractor = Extractor::new(Grammar::Summary).unwrap();
        let line = "FTM session complete. Estimated RTT - 99999999999999999999999 nSec, Estimated Distance - 1.00 meters";
        assert!(extractor.extract(line).is_none());
    }

    #[test]
    fn distance_keeps_two_fraction_digits() {
        assert_eq!(Distance::from_parts("3", "14").unwrap().to_string(), "3.14");
        assert_eq!(Distance::from_parts("3", "05").unwrap().to_string(), "3.05");
        assert_eq!(Distance::from_parts("0", "00").unwrap().to_string(), "0.00");
        assert_eq!(Distance::from_parts("10", "50").unwrap().to_string(), "10.50");
        assert!(Distance::from_parts("3", "1").is_none());
        assert!(Distance::from_parts("", "14").is_none());
    }

    #[test]
    fn grammar_parses_from_text() {
        assert_eq!("Summary".parse::<Grammar>().unwrap(), Grammar::Summary);
        assert!("burst".parse::<Grammar>().is_err());
        assert_eq!(Grammar::Session.header().len(), 4);
        assert_eq!(Grammar::Summary.header().len(), 3);
    }
}
