//! Durable side channels for the error log
//!
//! A mirror keeps a smaller, best-effort copy of recent records that survives
//! the in-memory ring (a JSON file in the console's data directory, the way
//! a browser console would use local storage). Callers must treat every
//! mirror failure as ignorable.

use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::record::ErrorRecord;
use crate::error::FaultlineResult;

pub trait DurableMirror: Send + Sync {
    /// Append `record`, trimming the oldest entries beyond `capacity`.
    fn append(&self, record: &ErrorRecord, capacity: usize) -> FaultlineResult<()>;

    fn clear(&self) -> FaultlineResult<()>;

    /// Records currently held, oldest first
    fn load(&self) -> FaultlineResult<Vec<ErrorRecord>>;
}

fn trim_front(records: &mut Vec<ErrorRecord>, capacity: usize) {
    if records.len() > capacity {
        let excess = records.len() - capacity;
        records.drain(..excess);
    }
}

/// In-process mirror, mostly useful for tests and embedded consoles
#[derive(Debug, Default)]
pub struct MemoryMirror {
    records: Mutex<Vec<ErrorRecord>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableMirror for MemoryMirror {
    fn append(&self, record: &ErrorRecord, capacity: usize) -> FaultlineResult<()> {
        let mut records = self.records.lock();
        records.push(record.clone());
        trim_front(&mut records, capacity);
        Ok(())
    }

    fn clear(&self) -> FaultlineResult<()> {
        self.records.lock().clear();
        Ok(())
    }

    fn load(&self) -> FaultlineResult<Vec<ErrorRecord>> {
        Ok(self.records.lock().clone())
    }
}

/// Mirror persisted as a JSON array in a single file
#[derive(Debug)]
pub struct FileMirror {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> FaultlineResult<Vec<ErrorRecord>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl DurableMirror for FileMirror {
    fn append(&self, record: &ErrorRecord, capacity: usize) -> FaultlineResult<()> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        records.push(record.clone());
        trim_front(&mut records, capacity);
        fs::write(&self.path, serde_json::to_vec(&records)?)?;
        Ok(())
    }

    fn clear(&self) -> FaultlineResult<()> {
        let _guard = self.lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> FaultlineResult<Vec<ErrorRecord>> {
        let _guard = self.lock.lock();
        self.read()
    }
}
