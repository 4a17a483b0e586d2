//! Append-only event log sinks.
//!
//! One `SharedEventLog` handle is constructed per run and passed to the
//! slicer and reaper. Sinks only ever append; readers replay the whole log or
//! a bounded prefix/suffix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::error::ObserverError;
use super::events::EvolutionaryEvent;

pub type SharedEventLog = Arc<dyn EventLog>;

pub trait EventLog: Send + Sync {
    /// Durably record one event as a single self-contained write.
    fn append(&self, event: &EvolutionaryEvent) -> Result<(), ObserverError>;

    /// Every event in append order.
    fn replay(&self) -> Result<Vec<EvolutionaryEvent>, ObserverError>;

    fn head(&self, n: usize) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
        let mut events = self.replay()?;
        events.truncate(n);
        Ok(events)
    }

    fn tail(&self, n: usize) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
        let mut events = self.replay()?;
        let skip = events.len().saturating_sub(n);
        Ok(events.split_off(skip))
    }

    fn len(&self) -> Result<usize, ObserverError> {
        Ok(self.replay()?.len())
    }

    fn is_empty(&self) -> Result<bool, ObserverError> {
        Ok(self.len()? == 0)
    }
}

// ============================================================================
// In-memory sink
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<EvolutionaryEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, event: &EvolutionaryEvent) -> Result<(), ObserverError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| ObserverError::LockPoisoned("in-memory event log"))?;
        guard.push(event.clone());
        Ok(())
    }

    fn replay(&self) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
        let guard = self
            .events
            .lock()
            .map_err(|_| ObserverError::LockPoisoned("in-memory event log"))?;
        Ok(guard.clone())
    }

    fn len(&self) -> Result<usize, ObserverError> {
        let guard = self
            .events
            .lock()
            .map_err(|_| ObserverError::LockPoisoned("in-memory event log"))?;
        Ok(guard.len())
    }
}

// ============================================================================
// JSONL file sink
// ============================================================================

/// Newline-delimited JSON log. Each event is serialized up front and written
/// with one `write_all` under the writer lock, then synced to disk.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    writer: Mutex<File>,
    sync_each_append: bool,
}

impl FileEventLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ObserverError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        truncate_torn_tail(&mut file, &path)?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
            sync_each_append: true,
        })
    }

    /// Skip the per-append `fsync`. Appends stay atomic but a crash may lose
    /// the most recent events.
    pub fn without_sync(mut self) -> Self {
        self.sync_each_append = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for FileEventLog {
    fn append(&self, event: &EvolutionaryEvent) -> Result<(), ObserverError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = self
            .writer
            .lock()
            .map_err(|_| ObserverError::LockPoisoned("file event log writer"))?;
        file.write_all(&line)?;
        file.flush()?;
        if self.sync_each_append {
            file.sync_data()?;
        }
        Ok(())
    }

    fn replay(&self) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
        read_jsonl_events(&self.path)
    }
}

const TAIL_SCAN_CHUNK: usize = 4096;

/// Cut an unterminated final line left by a crash mid-append, so the next
/// append starts on a fresh line.
fn truncate_torn_tail(file: &mut File, path: &Path) -> Result<(), ObserverError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut keep = 0;
    let mut cursor = len;
    let mut buf = [0u8; TAIL_SCAN_CHUNK];
    while cursor > 0 {
        let start = cursor.saturating_sub(TAIL_SCAN_CHUNK as u64);
        let chunk = &mut buf[..(cursor - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(index) = chunk.iter().rposition(|byte| *byte == b'\n') {
            keep = start + index as u64 + 1;
            break;
        }
        cursor = start;
    }
    warn!(
        path = %path.display(),
        dropped_bytes = len - keep,
        "truncating torn trailing event line"
    );
    file.set_len(keep)?;
    Ok(())
}

/// Read a JSONL event log. A torn final line (crash mid-append) is skipped;
/// a malformed line anywhere else is an error.
pub fn read_jsonl_events(path: &Path) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let last_index = lines.len().saturating_sub(1);
    let mut events = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(event) => events.push(event),
            Err(err) if index == last_index => {
                warn!(path = %path.display(), error = %err, "skipping torn trailing event line");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(events)
}
