use crate::grammar::{Extractor, Grammar};
use crate::prelude::{IngestResult, LineSource, ReadOutcome};
use crate::record::stamp;
use crate::telemetry::{IngestStats, LogManager, MetricsRecorder};
use crate::writer::RecordSink;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Immutable parameters of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub grammar: Grammar,
    /// Report every raw line at `info` instead of `debug`.
    pub echo_lines: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            grammar: Grammar::Session,
            echo_lines: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation flag was raised.
    Cancelled,
    /// The source reported end of stream.
    SourceExhausted,
    /// A source or storage failure ended the run.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// Single-threaded read, extract, stamp, append loop.
///
/// The loop owns its source and sink and drops both as soon as it stops,
/// whichever way it stops. Lines that fail to decode or match are skipped;
/// only source errors, storage errors and cancellation end a run.
pub struct IngestLoop<S, W> {
    extractor: Extractor,
    source: Option<S>,
    sink: Option<W>,
    state: LoopState,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<S: LineSource, W: RecordSink> IngestLoop<S, W> {
    pub fn new(config: IngestConfig, source: S, sink: W) -> IngestResult<Self> {
        Ok(Self {
            extractor: Extractor::new(config.grammar)?,
            source: Some(source),
            sink: Some(sink),
            state: LoopState::Running,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new(config.echo_lines),
        })
    }

    pub fn grammar(&self) -> Grammar {
        self.extractor.grammar()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.metrics.snapshot()
    }

    /// Whether the source and sink are still held.
    pub fn holds_resources(&self) -> bool {
        self.source.is_some() || self.sink.is_some()
    }

    /// Runs until `cancel` is raised, the source ends or a fatal error occurs.
    ///
    /// `cancel` is checked between iterations, so a blocked read delays
    /// shutdown by at most the source's read timeout. Calling `run` on a
    /// stopped loop returns the original stop reason.
    pub fn run(&mut self, cancel: &AtomicBool) -> IngestResult<StopReason> {
        if let LoopState::Stopped(reason) = self.state {
            return Ok(reason);
        }

        info!("listening for {} records", self.grammar());
        let outcome = self.drive(cancel);
        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(err) => {
                warn!("ingestion failed: {}", err);
                StopReason::Failed
            }
        };
        self.stop(reason);
        outcome
    }

    fn drive(&mut self, cancel: &AtomicBool) -> IngestResult<StopReason> {
        let (Some(source), Some(sink)) = (self.source.as_mut(), self.sink.as_mut()) else {
            return Ok(StopReason::SourceExhausted);
        };

        loop {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StopReason::Cancelled);
            }

            let line = match source.next_line()? {
                ReadOutcome::Timeout => {
                    self.metrics.record_timeout();
                    continue;
                }
                ReadOutcome::Eof => return Ok(StopReason::SourceExhausted),
                ReadOutcome::Line(line) => line,
            };

            if line.is_empty() {
                self.metrics.record_empty();
                continue;
            }
            self.metrics.record_line();
            self.logger.record_line(&line);

            let Some(measurement) = self.extractor.extract(&line) else {
                self.metrics.record_unmatched();
                self.logger.record_unmatched(&line);
                continue;
            };
            self.metrics.record_matched();

            let record = stamp(measurement);
            sink.append(&record)?;
            self.metrics.record_written();
            self.logger.record_write(&record);
        }
    }

    fn stop(&mut self, reason: StopReason) {
        if let Some(source) = &self.source {
            self.metrics.record_discarded_frames(source.discarded_frames());
        }
        // close the log before the port
        drop(self.sink.take());
        drop(self.source.take());
        self.state = LoopState::Stopped(reason);
        info!("ingestion stopped ({:?}): {}", reason, self.metrics.snapshot());
    }
}
