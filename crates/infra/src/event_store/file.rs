//! Durable event store: one JSON-lines log file shared by all wallet streams.
//!
//! Each committed batch is written as a single line (a JSON array of
//! [`StoredEvent`]s) followed by `\n`, then flushed and `sync_data`-ed before
//! `append` returns. A crash mid-write leaves a trailing line without its
//! newline; that torn batch is discarded (and the file truncated) on open, so
//! a batch is either fully present or absent. A write that fails while the
//! process keeps running is cut back the same way before the next append.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use quorumtoken_core::{ExpectedVersion, WalletId};

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, current_version, sequence_batch,
};

/// The file operations the log needs beyond `Write`.
trait LogFile: Write {
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
    fn sync(&mut self) -> std::io::Result<()>;
}

impl LogFile for File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_data()
    }
}

#[derive(Debug)]
struct Inner<F = File> {
    file: F,
    /// Bytes of complete, committed batches.
    len: u64,
    /// A failed write may have left bytes past `len`.
    dirty: bool,
    streams: HashMap<WalletId, Vec<StoredEvent>>,
}

impl<F: LogFile> Inner<F> {
    fn append(
        &mut self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(wallet_id) = events.first().map(|e| e.wallet_id) else {
            return Ok(vec![]);
        };

        let current = self
            .streams
            .get(&wallet_id)
            .map(|s| current_version(s))
            .unwrap_or(0);

        let committed = sequence_batch(events, expected_version, current)?;

        let mut line = serde_json::to_string(&committed)
            .map_err(|e| EventStoreError::InvalidAppend(format!("batch serialization failed: {e}")))?;
        line.push('\n');

        if self.dirty {
            self.rollback()?;
        }

        if let Err(err) = self.write_line(line.as_bytes()) {
            self.dirty = true;
            if let Err(rollback) = self.rollback() {
                tracing::warn!(
                    len = self.len,
                    error = %rollback,
                    "could not cut back a failed append; retrying before the next one"
                );
            }
            return Err(err.into());
        }
        self.len += line.len() as u64;

        self.streams
            .entry(wallet_id)
            .or_default()
            .extend(committed.iter().cloned());

        Ok(committed)
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        self.file.sync()
    }

    /// Drop whatever a failed write left after the last committed batch.
    fn rollback(&mut self) -> std::io::Result<()> {
        self.file.truncate(self.len)?;
        self.file.sync()?;
        self.dirty = false;
        Ok(())
    }
}

/// File-backed [`EventStore`]. All streams are cached in memory after open.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileEventStore {
    /// Open (or create) the log at `path` and load every stream.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventStoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let (streams, valid_len) = parse_log(&contents)?;
        if valid_len < contents.len() {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = contents.len() - valid_len,
                "discarding torn trailing batch"
            );
            file.set_len(valid_len as u64)?;
            file.sync_data()?;
        }

        tracing::debug!(
            path = %path.display(),
            streams = streams.len(),
            "opened event log"
        );

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                file,
                len: valid_len as u64,
                dirty: false,
                streams,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStore for FileEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut inner = self.inner.lock().map_err(|_| EventStoreError::Poisoned)?;
        inner.append(events, expected_version)
    }

    fn load_stream(&self, wallet_id: WalletId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.lock().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.streams.get(&wallet_id).cloned().unwrap_or_default())
    }
}

/// Parse complete lines; returns the streams and the byte length of the
/// valid prefix. Only an unterminated last line may be dropped.
fn parse_log(
    contents: &str,
) -> Result<(HashMap<WalletId, Vec<StoredEvent>>, usize), EventStoreError> {
    let mut streams: HashMap<WalletId, Vec<StoredEvent>> = HashMap::new();
    let mut valid_len = 0;

    for (line_no, line) in contents.split_inclusive('\n').enumerate() {
        if !line.ends_with('\n') {
            break;
        }
        let body = line.trim_end();
        if !body.is_empty() {
            let batch: Vec<StoredEvent> = serde_json::from_str(body).map_err(|e| {
                EventStoreError::Corrupt(format!("line {}: {e}", line_no + 1))
            })?;

            for event in batch {
                let stream = streams.entry(event.wallet_id).or_default();
                let expected = current_version(stream) + 1;
                if event.sequence_number != expected {
                    return Err(EventStoreError::Corrupt(format!(
                        "line {}: wallet {} expected sequence {expected}, found {}",
                        line_no + 1,
                        event.wallet_id,
                        event.sequence_number
                    )));
                }
                stream.push(event);
            }
        }
        valid_len += line.len();
    }

    Ok((streams, valid_len))
}
