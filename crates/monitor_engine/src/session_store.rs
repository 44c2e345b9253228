use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use monitor_core::{RunStatus, SessionError, SessionRecord};

use crate::persist::AtomicFileWriter;

pub const SESSION_FILENAME: &str = "pentest_session.json";

/// Durable home of the single session record.
///
/// Reads never fail: a missing or malformed file means "no session". Write
/// failures are logged and the in-memory record stays authoritative for the
/// rest of the process.
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
    current: Option<SessionRecord>,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
            current: None,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    pub fn current(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }

    /// Persists a new record. Fails only if one is already held in memory.
    pub fn start(&mut self, record: SessionRecord) -> Result<(), SessionError> {
        if let Some(existing) = &self.current {
            return Err(SessionError::AlreadyActive(existing.agent_id.clone()));
        }
        self.write(&record);
        engine_info!("Session started agent_id={} target={}", record.agent_id, record.target);
        self.current = Some(record);
        Ok(())
    }

    /// Merges `status` into the held record; no-op without one.
    pub fn update_status(&mut self, status: RunStatus) {
        let Some(record) = self.current.as_mut() else {
            return;
        };
        if record.status == status {
            return;
        }
        record.status = status;
        let record = record.clone();
        self.write(&record);
        engine_debug!("Session status agent_id={} status={}", record.agent_id, status);
    }

    /// Loads the persisted record, if any, and holds it as current.
    pub fn restore(&mut self) -> Option<SessionRecord> {
        let record = read_record(&self.path())?;
        engine_info!(
            "Restored session agent_id={} status={}",
            record.agent_id,
            record.status
        );
        self.current = Some(record.clone());
        Some(record)
    }

    /// Removes the record unconditionally.
    pub fn clear(&mut self) {
        self.current = None;
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => engine_info!("Cleared session at {:?}", path),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => engine_warn!("Failed to remove session file {:?}: {}", path, err),
        }
    }

    fn write(&self, record: &SessionRecord) {
        if let Err(err) = self.writer.write_json(SESSION_FILENAME, record) {
            engine_warn!("Failed to write session record to {:?}: {}", self.dir, err);
        }
    }
}

fn read_record(path: &Path) -> Option<SessionRecord> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            engine_warn!("Failed to read session record from {:?}: {}", path, err);
            return None;
        }
    };
    match serde_json::from_slice::<SessionRecord>(&content) {
        Ok(record) if !record.agent_id.is_empty() => Some(record),
        Ok(_) => {
            engine_warn!("Ignoring session record without agent id at {:?}", path);
            None
        }
        Err(err) => {
            engine_warn!("Ignoring malformed session record at {:?}: {}", path, err);
            None
        }
    }
}
