//! Append-only audit sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Which half of a request an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPhase {
    Start,
    End,
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub correlation_id: Uuid,
    pub phase: AuditPhase,
    pub method: String,
    pub path: String,
    pub subject: Option<String>,
    /// Terminal status; always `None` on start records.
    pub status: Option<u16>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Durably append one record. An `Ok` return means the record persisted.
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;

    /// Records with `time >= since`, in append order.
    fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditRecord>, AuditError>;
}

/// Audit sink held in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        // Push is the only mutation, so a poisoned vector is still whole.
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.time >= since)
            .collect())
    }
}

/// Audit sink appending JSON lines to a file, synced on every write.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!(path = ?path, "Audit log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditRecord>, AuditError> {
        // Held for the whole read so no append lands half-written under it.
        let _guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AuditRecord = serde_json::from_str(&line)?;
            if record.time >= since {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record(phase: AuditPhase, time: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            correlation_id: Uuid::new_v4(),
            phase,
            method: "GET".into(),
            path: "/spaces/1/messages".into(),
            subject: None,
            status: None,
            time,
        }
    }

    #[test]
    fn test_memory_read_since_filters_by_time() {
        let log = MemoryAuditLog::new();
        let now = Utc::now();
        log.append(&record(AuditPhase::Start, now - TimeDelta::hours(2))).unwrap();
        log.append(&record(AuditPhase::Start, now)).unwrap();

        let recent = log.read_since(now - TimeDelta::hours(1)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].time, now);
        assert_eq!(log.records().len(), 2);
    }

    #[test]
    fn test_file_log_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("natter-audit-{}.jsonl", Uuid::new_v4()));
        let now = Utc::now();
        let mut end = record(AuditPhase::End, now);
        end.subject = Some("alice".into());
        end.status = Some(201);

        {
            let log = FileAuditLog::open(&path).unwrap();
            log.append(&record(AuditPhase::Start, now)).unwrap();
            log.append(&end).unwrap();
        }

        let reopened = FileAuditLog::open(&path).unwrap();
        let records = reopened.read_since(now - TimeDelta::minutes(1)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], end);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_file_reads_during_appends_see_whole_lines() {
        let path = std::env::temp_dir().join(format!("natter-audit-{}.jsonl", Uuid::new_v4()));
        let log = FileAuditLog::open(&path).unwrap();
        let since = Utc::now() - TimeDelta::minutes(1);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        log.append(&record(AuditPhase::Start, Utc::now())).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                let mut seen = 0;
                for _ in 0..50 {
                    let records = log.read_since(since).expect("read saw a partial line");
                    assert!(records.len() >= seen);
                    seen = records.len();
                }
            });
        });

        assert_eq!(log.read_since(since).unwrap().len(), 100);
        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_value(record(AuditPhase::End, Utc::now())).unwrap();
        assert_eq!(json["phase"], "end");
    }
}
