use crate::prelude::{IngestError, IngestResult, LineSource, ReadOutcome};
use log::warn;
use std::io::{ErrorKind, Read};

/// Longest frame accepted before the buffered bytes are dropped as noise.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

const READ_CHUNK: usize = 256;

/// Frames a byte stream into newline-delimited text lines.
///
/// Bytes that arrive without a delimiter stay buffered across read timeouts,
/// so a line split over several polls is returned whole once its `\n` shows
/// up. Decoding is lossy: invalid UTF-8 becomes U+FFFD instead of an error.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    max_line_len: usize,
    discarding: bool,
    discarded_frames: usize,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(READ_CHUNK),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            discarding: false,
            discarded_frames: 0,
            eof: false,
        }
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    /// Number of oversize frames dropped so far.
    pub fn discarded_frames(&self) -> usize {
        self.discarded_frames
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Polls the source until a full line, a timeout or end of stream.
    pub fn next_line(&mut self) -> IngestResult<ReadOutcome> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.take_buffered_line() {
                return Ok(ReadOutcome::Line(line));
            }

            if self.eof {
                if self.pending.is_empty() || self.discarding {
                    self.pending.clear();
                    return Ok(ReadOutcome::Eof);
                }
                let tail = std::mem::take(&mut self.pending);
                return Ok(ReadOutcome::Line(decode_line(&tail)));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(read) => self.pending.extend_from_slice(&chunk[..read]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(ReadOutcome::Timeout);
                }
                Err(err) => {
                    return Err(IngestError::source_failure("reading device output", err));
                }
            }
        }
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let frame: Vec<u8> = self.pending.drain(..=pos).collect();
            if self.discarding {
                // tail of an oversize frame; resync on the next delimiter
                self.discarding = false;
                continue;
            }
            return Some(decode_line(&frame));
        }

        if self.pending.len() > self.max_line_len {
            if !self.discarding {
                warn!(
                    "dropping {} bytes without a line delimiter",
                    self.pending.len()
                );
                self.discarded_frames += 1;
                self.discarding = true;
            }
            self.pending.clear();
        }
        None
    }
}

impl<R: Read> LineSource for LineReader<R> {
    fn next_line(&mut self) -> IngestResult<ReadOutcome> {
        LineReader::next_line(self)
    }

    fn discarded_frames(&self) -> usize {
        LineReader::discarded_frames(self)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
