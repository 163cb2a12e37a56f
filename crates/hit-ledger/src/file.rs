//! JSON-lines history ledger.
//!
//! Layout: one `EvaluationRecord` per line, in append order. The file is
//! replayed into an in-memory mirror on open; snapshots are served from the
//! mirror and never touch the disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::{HistoryLedger, LedgerResult};
use crate::memory::MemoryHistoryLedger;
use crate::record::{EvaluationRecord, LedgerPosition};

/// Ledger that persists every record before publishing it.
///
/// Appenders serialize on the file mutex; the mirror is updated while that
/// mutex is still held so file order and position order always agree.
pub struct FileHistoryLedger {
    path: PathBuf,
    state: Mutex<AppendState>,
    mirror: MemoryHistoryLedger,
}

struct AppendState {
    file: File,
    /// Length of the file up to the last fully written line.
    committed: u64,
    /// A failed append left bytes past `committed` that are not yet cut off.
    torn: bool,
    /// Devices and pipes cannot be truncated.
    regular: bool,
}

impl AppendState {
    async fn cut_torn_tail(&mut self) -> std::io::Result<()> {
        if self.torn {
            self.file.set_len(self.committed).await?;
            self.torn = false;
        }
        Ok(())
    }
}

impl FileHistoryLedger {
    /// Open (or create) a ledger file, replaying any records it holds.
    ///
    /// An unterminated final line left by an interrupted append is cut off.
    pub async fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let Replayed { records, committed } = replay_file(&path).await?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let on_disk = file.metadata().await?;
        let regular = on_disk.is_file();
        if regular && on_disk.len() > committed {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = on_disk.len() - committed,
                "truncating unterminated ledger tail"
            );
            file.set_len(committed).await?;
        }
        tracing::info!(path = %path.display(), records = records.len(), "history ledger opened");

        Ok(Self {
            path,
            state: Mutex::new(AppendState {
                file,
                committed,
                torn: false,
                regular,
            }),
            mirror: MemoryHistoryLedger::from_records(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct Replayed {
    records: Vec<EvaluationRecord>,
    committed: u64,
}

/// Decode every non-empty line of a ledger file.
///
/// Missing files and non-regular files (devices, pipes) replay as empty. A
/// final line without its newline is the remains of an interrupted append
/// and is skipped; this function never modifies the file.
pub async fn replay(path: &Path) -> LedgerResult<Vec<EvaluationRecord>> {
    Ok(replay_file(path).await?.records)
}

async fn replay_file(path: &Path) -> LedgerResult<Replayed> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Ok(Replayed {
                records: Vec::new(),
                committed: 0,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Replayed {
                records: Vec::new(),
                committed: 0,
            })
        }
        Err(e) => return Err(LedgerError::Io(e)),
    }

    let contents = tokio::fs::read_to_string(path).await?;
    let mut records = Vec::new();
    let mut committed = 0u64;

    for (idx, chunk) in contents.split_inclusive('\n').enumerate() {
        let Some(line) = chunk.strip_suffix('\n') else {
            if !chunk.trim().is_empty() {
                tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    bytes = chunk.len(),
                    "skipping unterminated ledger line"
                );
            }
            break;
        };
        committed += chunk.len() as u64;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(Replayed { records, committed })
}

#[async_trait]
impl HistoryLedger for FileHistoryLedger {
    async fn append(&self, record: EvaluationRecord) -> LedgerResult<LedgerPosition> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut state = self.state.lock().await;
        let written = async {
            state.cut_torn_tail().await?;
            state.file.write_all(&line).await?;
            state.file.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), error = %e, "ledger append failed");
            state.torn = state.regular;
            if let Err(cut) = state.cut_torn_tail().await {
                tracing::warn!(path = %self.path.display(), error = %cut, "ledger tail left torn");
            }
            return Err(LedgerError::Unavailable(e.to_string()));
        }

        state.committed += line.len() as u64;
        let position = self.mirror.push(record);
        drop(state);

        tracing::trace!(position = %position, "record persisted");
        Ok(position)
    }

    async fn snapshot(&self) -> Vec<EvaluationRecord> {
        self.mirror.copy_all()
    }

    async fn snapshot_tail(&self, limit: usize) -> Vec<EvaluationRecord> {
        self.mirror.copy_tail(limit)
    }

    async fn len(&self) -> usize {
        self.mirror.count()
    }
}
