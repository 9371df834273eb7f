use super::records::LogRecord;
use anyhow::Result;
use csv::Writer;
use parking_lot::RwLock;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Destination for event log records.
pub trait EventSink: Send {
    fn record(&mut self, record: &LogRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes the tagged line format, one record per line.
pub struct LineSink<W: Write + Send> {
    out: W,
}

impl LineSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventSink for LineSink<W> {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        writeln!(self.out, "{}", record)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One CSV file per record kind, headers taken from the record fields.
pub struct CsvSink {
    nodes: Writer<File>,
    positions: Writer<File>,
    candidates: Writer<File>,
    jobs: Writer<File>,
    tasks: Writer<File>,
    paths: Vec<PathBuf>,
}

impl CsvSink {
    pub fn create(dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        let mut open = |kind: &str| -> Result<Writer<File>> {
            let path = dir.join(format!("{}_{}.csv", prefix, kind));
            let writer = Writer::from_path(&path)?;
            paths.push(path);
            Ok(writer)
        };

        Ok(Self {
            nodes: open("nodes")?,
            positions: open("positions")?,
            candidates: open("candidates")?,
            jobs: open("jobs")?,
            tasks: open("tasks")?,
            paths,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn write<S: Serialize>(writer: &mut Writer<File>, row: &S) -> Result<()> {
        writer.serialize(row)?;
        Ok(())
    }
}

impl EventSink for CsvSink {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        match record {
            LogRecord::Node(r) => Self::write(&mut self.nodes, r),
            LogRecord::Position(r) => Self::write(&mut self.positions, r),
            LogRecord::Candidate(r) => Self::write(&mut self.candidates, r),
            LogRecord::Job(r) => Self::write(&mut self.jobs, r),
            LogRecord::Task(r) => Self::write(&mut self.tasks, r),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.nodes.flush()?;
        self.positions.flush()?;
        self.candidates.flush()?;
        self.jobs.flush()?;
        self.tasks.flush()?;
        Ok(())
    }
}

/// Shared in-memory buffer. Clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.records.read().iter().filter(|r| r.tag() == tag).count()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }
}

/// Mirrors records into the diagnostic log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        debug!(target: "taskmesh::events", "{}", record);
        Ok(())
    }
}
