use crate::grammar::Grammar;
use crate::prelude::{IngestError, IngestResult};
use crate::record::Record;
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Destination for stamped records.
///
/// `append` must not return `Ok` before the record is durable.
pub trait RecordSink {
    fn append(&mut self, record: &Record) -> IngestResult<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn append(&mut self, record: &Record) -> IngestResult<()> {
        (**self).append(record)
    }
}

/// Append-only CSV log, synced to disk after every row.
pub struct CsvLog {
    path: PathBuf,
    grammar: Grammar,
    file: File,
    rows_written: usize,
}

impl CsvLog {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// The grammar's header row is written only when the file is empty, so
    /// reopening an existing log continues it without a second header. An
    /// existing log must carry this grammar's header, and an unterminated
    /// last row is closed off before anything is appended to it.
    pub fn open<P: AsRef<Path>>(path: P, grammar: Grammar) -> IngestResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| IngestError::storage_failure(&path, err))?;
        let existing = file
            .metadata()
            .map_err(|err| IngestError::storage_failure(&path, err))?
            .len();

        let expected = grammar.header().join(",");
        let mut terminated = true;
        if existing > 0 {
            let (header, last) = inspect_existing(&mut file, existing)
                .map_err(|err| IngestError::storage_failure(&path, err))?;
            if header != expected {
                return Err(IngestError::SchemaMismatch {
                    expected: grammar.name(),
                    found: header_grammar(&header),
                });
            }
            terminated = last == b'\n';
        }

        let mut log = Self {
            path,
            grammar,
            file,
            rows_written: 0,
        };

        if existing == 0 {
            log.write_line(&expected)?;
            info!("created {} log {}", grammar, log.path.display());
        } else {
            if !terminated {
                warn!(
                    "{} ends in a partial row, terminating it",
                    log.path.display()
                );
                log.write_line("")?;
            }
            debug!(
                "appending to existing log {} ({} bytes)",
                log.path.display(),
                existing
            );
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Rows appended through this handle.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn write_line(&mut self, line: &str) -> IngestResult<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.file
            .write_all(&bytes)
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data())
            .map_err(|err| IngestError::storage_failure(&self.path, err))
    }
}

/// Returns the header line (without its terminator) and the final byte.
fn inspect_existing(file: &mut File, len: u64) -> io::Result<(String, u8)> {
    file.seek(SeekFrom::Start(0))?;
    let mut header = Vec::new();
    BufReader::new(&mut *file).read_until(b'\n', &mut header)?;
    let header = String::from_utf8_lossy(&header);

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok((header.trim_end_matches(['\r', '\n']).to_string(), last[0]))
}

fn header_grammar(header: &str) -> &'static str {
    [Grammar::Session, Grammar::Summary]
        .into_iter()
        .find(|g| g.header().join(",") == header)
        .map(Grammar::name)
        .unwrap_or("unrecognized header")
}

impl RecordSink for CsvLog {
    fn append(&mut self, record: &Record) -> IngestResult<()> {
        let found = record.measurement.grammar();
        if found != self.grammar {
            return Err(IngestError::SchemaMismatch {
                expected: self.grammar.name(),
                found: found.name(),
            });
        }
        let row = record.to_row().join(",");
        self.write_line(&row)?;
        self.rows_written += 1;
        Ok(())
    }
}
