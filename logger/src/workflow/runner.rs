use crate::generator::profile::{GeneratorConfig, SimulatedDevice};
use crate::workflow::config::LoggerConfig;
use anyhow::Context;
use ftmcore::source::{open_replay, open_serial};
use ftmcore::telemetry::IngestStats;
use ftmcore::{CsvLog, IngestLoop, LineSource, StopReason};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

/// Where device lines come from for a run.
#[derive(Debug, Clone)]
pub enum SourceKind {
    Serial,
    Replay(PathBuf),
    Simulated(GeneratorConfig),
}

pub struct RunSummary {
    pub reason: StopReason,
    pub stats: IngestStats,
    pub output: PathBuf,
}

impl RunSummary {
    pub fn status_message(&self) -> &'static str {
        match self.reason {
            StopReason::Cancelled => "Stopped by user",
            StopReason::SourceExhausted => "Source exhausted",
            // execute() reports failed runs as Err, never as a summary
            StopReason::Failed => "Stopped on failure",
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: LoggerConfig,
}

impl Runner {
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    /// Opens the source and the log, then ingests until stopped.
    ///
    /// Both resources are released before this returns, on success and on
    /// error alike.
    pub fn execute(&self, kind: &SourceKind, cancel: &AtomicBool) -> anyhow::Result<RunSummary> {
        match kind {
            SourceKind::Serial => {
                let serial = self.config.to_serial_config();
                info!(
                    "opening {} at {} baud ({} ms timeout)",
                    serial.port,
                    serial.baud_rate,
                    serial.timeout.as_millis()
                );
                let source = open_serial(&serial)
                    .with_context(|| format!("opening serial port {}", serial.port))?;
                self.ingest(source, cancel)
            }
            SourceKind::Replay(path) => {
                info!("replaying {}", path.display());
                let source = open_replay(path)
                    .with_context(|| format!("opening replay file {}", path.display()))?;
                self.ingest(source, cancel)
            }
            SourceKind::Simulated(generator) => {
                info!("simulating a {} device (seed {})", generator.grammar, generator.seed);
                self.ingest(SimulatedDevice::new(generator.clone()), cancel)
            }
        }
    }

    fn ingest<S: LineSource>(&self, source: S, cancel: &AtomicBool) -> anyhow::Result<RunSummary> {
        let output = self.config.output.clone();
        let log = CsvLog::open(&output, self.config.grammar)
            .with_context(|| format!("opening output log {}", output.display()))?;

        let mut ingest = IngestLoop::new(self.config.to_ingest_config(), source, log)
            .context("building ingestion loop")?;
        let reason = ingest.run(cancel).context("ingesting device output")?;

        Ok(RunSummary {
            reason,
            stats: ingest.stats(),
            output,
        })
    }
}
