use crate::generator::template::{device_log, session_line, summary_line, NOISE_LINES};
use ftmcore::{Grammar, IngestResult, LineSource, ReadOutcome};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Centimeters of range per nanosecond of round-trip time.
const CM_PER_RTT_NS: u64 = 15;

/// Configuration for the simulated ranging device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub grammar: Grammar,
    pub seed: u64,
    /// Share of polls answered with unrelated console output.
    pub noise: f64,
    /// Share of polls that time out with no data.
    pub silence: f64,
    /// Delay before each poll, standing in for the port's read latency.
    pub interval_ms: u64,
    /// Stop with end-of-stream after this many polls.
    pub max_polls: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            grammar: Grammar::Session,
            seed: 0,
            noise: 0.3,
            silence: 0.1,
            interval_ms: 250,
            max_polls: None,
        }
    }
}

/// Stand-in for the serial device that prints plausible FTM console output.
pub struct SimulatedDevice {
    config: GeneratorConfig,
    rng: StdRng,
    polls: usize,
    uptime_ms: u64,
}

impl SimulatedDevice {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            polls: 0,
            uptime_ms: 0,
        }
    }

    fn measurement_line(&mut self) -> String {
        let est_rtt_ns = self.rng.gen_range(1..400u64);
        let distance_cm = est_rtt_ns * CM_PER_RTT_NS;
        match self.config.grammar {
            Grammar::Session => {
                let raw_rtt_ns = est_rtt_ns + self.rng.gen_range(0..25u64);
                session_line(raw_rtt_ns, est_rtt_ns, distance_cm)
            }
            Grammar::Summary => summary_line(est_rtt_ns, distance_cm),
        }
    }
}

impl LineSource for SimulatedDevice {
    fn next_line(&mut self) -> IngestResult<ReadOutcome> {
        if self.config.max_polls.is_some_and(|max| self.polls >= max) {
            return Ok(ReadOutcome::Eof);
        }
        self.polls += 1;

        if self.config.interval_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.interval_ms));
        }
        self.uptime_ms += self.config.interval_ms.max(1);

        let roll: f64 = self.rng.gen();
        if roll < self.config.silence {
            return Ok(ReadOutcome::Timeout);
        }
        let message = if roll < self.config.silence + self.config.noise {
            NOISE_LINES[self.rng.gen_range(0..NOISE_LINES.len())].to_string()
        } else {
            self.measurement_line()
        };
        Ok(ReadOutcome::Line(device_log('I', self.uptime_ms, &message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftmcore::Extractor;

    fn quick_config(grammar: Grammar, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            grammar,
            seed,
            interval_ms: 0,
            max_polls: Some(200),
            ..Default::default()
        }
    }

    fn drain(device: &mut SimulatedDevice) -> Vec<ReadOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match device.next_line().unwrap() {
                ReadOutcome::Eof => return outcomes,
                other => outcomes.push(other),
            }
        }
    }

    #[test]
    fn generator_stops_after_max_polls() {
        let mut device = SimulatedDevice::new(quick_config(Grammar::Session, 7));
        assert_eq!(drain(&mut device).len(), 200);
        assert_eq!(device.next_line().unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn generator_is_deterministic_per_seed() {
        let a = drain(&mut SimulatedDevice::new(quick_config(Grammar::Summary, 13)));
        let b = drain(&mut SimulatedDevice::new(quick_config(Grammar::Summary, 13)));
        assert_eq!(a, b);
    }

    #[test]
    fn generated_measurements_match_only_their_grammar() {
        for grammar in [Grammar::Session, Grammar::Summary] {
            let other = match grammar {
                Grammar::Session => Grammar::Summary,
                Grammar::Summary => Grammar::Session,
            };
            let own = Extractor::new(grammar).unwrap();
            let foreign = Extractor::new(other).unwrap();
            let mut device = SimulatedDevice::new(quick_config(grammar, 3));

            let lines: Vec<String> = drain(&mut device)
                .into_iter()
                .filter_map(|outcome| match outcome {
                    ReadOutcome::Line(line) => Some(line),
                    _ => None,
                })
                .collect();
            let matched = lines.iter().filter(|l| own.extract(l).is_some()).count();

            assert!(matched > 0);
            assert!(matched < lines.len());
            assert!(lines.iter().all(|l| foreign.extract(l).is_none()));
        }
    }
}
