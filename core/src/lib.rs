//! Ingestion core for FTM ranging telemetry.
//!
//! Device output arrives as a line-delimited byte stream. The modules frame
//! it into lines, extract measurements under one grammar per run, stamp them
//! with the local wall clock and append them durably to a CSV log.

pub mod grammar;
pub mod ingest;
pub mod prelude;
pub mod reader;
pub mod record;
pub mod source;
pub mod telemetry;
pub mod writer;

pub use grammar::{Distance, Extractor, Grammar, Measurement};
pub use ingest::{IngestConfig, IngestLoop, LoopState, StopReason};
pub use prelude::{IngestError, IngestResult, LineSource, ReadOutcome};
pub use reader::LineReader;
pub use record::{stamp, Record};
pub use writer::{CsvLog, RecordSink};
