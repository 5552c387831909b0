use std::fmt;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: usize,
    pub empty_lines: usize,
    pub timeouts: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub written: usize,
    pub discarded_frames: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines={} empty={} timeouts={} matched={} unmatched={} written={} discarded={}",
            self.lines,
            self.empty_lines,
            self.timeouts,
            self.matched,
            self.unmatched,
            self.written,
            self.discarded_frames
        )
    }
}

/// Tallies loop outcomes. Owned by the loop, so no locking.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    stats: IngestStats,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_timeout(&mut self) {
        self.stats.timeouts += 1;
    }

    pub fn record_empty(&mut self) {
        self.stats.empty_lines += 1;
    }

    pub fn record_line(&mut self) {
        self.stats.lines += 1;
    }

    pub fn record_unmatched(&mut self) {
        self.stats.unmatched += 1;
    }

    pub fn record_matched(&mut self) {
        self.stats.matched += 1;
    }

    pub fn record_written(&mut self) {
        self.stats.written += 1;
    }

    /// Takes the source's running total of dropped frames.
    pub fn record_discarded_frames(&mut self, total: usize) {
        self.stats.discarded_frames = total;
    }

    pub fn snapshot(&self) -> IngestStats {
        self.stats
    }
}
