use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use shadow_types::{AuditBlock, TransactionId, TransactionWitness};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryAuditStore;
use crate::traits::AuditStore;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One committed block and its witnesses, as written to disk.
#[derive(Serialize, Deserialize)]
struct CommitRecord {
    block: AuditBlock,
    witnesses: Vec<TransactionWitness>,
}

/// Append-only file-backed audit store.
///
/// Each commit is a single framed record:
///
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON CommitRecord)]
/// ```
///
/// On open the file is replayed front to back into an in-memory index. A
/// damaged final record is treated as a torn write: it is dropped and the
/// file is truncated to the last good record. Damage anywhere before the
/// final record is reported as [`StoreError::Corrupt`]. Replayed records go
/// through the same continuity checks as live commits.
pub struct FileAuditStore {
    path: PathBuf,
    file: Mutex<File>,
    index: InMemoryAuditStore,
}

impl FileAuditStore {
    /// Open (or create) a store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let index = InMemoryAuditStore::new();
        let valid_len = if path.exists() {
            replay(&fs::read(&path)?, &index)?
        } else {
            0
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() > valid_len {
            warn!(path = %path.display(), valid_len, "truncating torn tail record");
            file.set_len(valid_len)?;
        }

        info!(
            path = %path.display(),
            blocks = index.block_count()?,
            "audit store opened"
        );
        Ok(Self {
            path,
            file: Mutex::new(file),
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replay framed records from `data` into `index`.
///
/// Returns the byte length of the valid prefix.
fn replay(data: &[u8], index: &InMemoryAuditStore) -> StoreResult<u64> {
    let mut offset = 0usize;
    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining < HEADER_SIZE {
            warn!(offset, remaining, "partial record header at end of file");
            break;
        }

        let header = &data[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let end = offset + HEADER_SIZE + length;

        if length == 0 || end > data.len() {
            warn!(offset, length, "truncated record at end of file");
            break;
        }

        let payload = &data[offset + HEADER_SIZE..end];
        if crc32fast::hash(payload) != expected_crc {
            if end == data.len() {
                warn!(offset, "CRC mismatch in final record; treating as torn write");
                break;
            }
            return Err(StoreError::Corrupt {
                offset: offset as u64,
                reason: "CRC mismatch".into(),
            });
        }

        let record: CommitRecord =
            serde_json::from_slice(payload).map_err(|e| StoreError::Corrupt {
                offset: offset as u64,
                reason: format!("undecodable record: {e}"),
            })?;
        index
            .commit_block(&record.block, &record.witnesses)
            .map_err(|e| StoreError::Corrupt {
                offset: offset as u64,
                reason: e.to_string(),
            })?;

        debug!(offset, height = record.block.height, "replayed block");
        offset = end;
    }
    Ok(offset as u64)
}

fn encode(block: &AuditBlock, witnesses: &[TransactionWitness]) -> StoreResult<Vec<u8>> {
    let record = CommitRecord {
        block: block.clone(),
        witnesses: witnesses.to_vec(),
    };
    let payload =
        serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("record exceeds 4 GiB".into()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

impl std::fmt::Debug for FileAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAuditStore")
            .field("path", &self.path)
            .field("index", &self.index)
            .finish()
    }
}

impl AuditStore for FileAuditStore {
    fn commit_block(&self, block: &AuditBlock, witnesses: &[TransactionWitness]) -> StoreResult<()> {
        let mut file = self.file.lock().map_err(|_| StoreError::LockPoisoned)?;

        // Validate against the index before anything reaches disk.
        let tip = self.index.latest_block()?;
        crate::traits::check_commit(tip.as_ref(), block, witnesses, |id| {
            matches!(self.index.witness(id), Ok(Some(_)))
        })?;

        let frame = encode(block, witnesses)?;
        let before = file.metadata()?.len();
        if let Err(e) = file.write_all(&frame).and_then(|()| file.sync_data()) {
            warn!(height = block.height, error = %e, "append failed; rolling back");
            file.set_len(before)?;
            return Err(e.into());
        }

        self.index.commit_block(block, witnesses)?;
        debug!(height = block.height, bytes = frame.len(), "block appended");
        Ok(())
    }

    fn latest_block(&self) -> StoreResult<Option<AuditBlock>> {
        self.index.latest_block()
    }

    fn block(&self, height: u64) -> StoreResult<Option<AuditBlock>> {
        self.index.block(height)
    }

    fn recent_blocks(&self, n: usize) -> StoreResult<Vec<AuditBlock>> {
        self.index.recent_blocks(n)
    }

    fn witness(&self, transaction_id: &TransactionId) -> StoreResult<Option<TransactionWitness>> {
        self.index.witness(transaction_id)
    }

    fn witnesses_for_block(&self, height: u64) -> StoreResult<Vec<TransactionWitness>> {
        self.index.witnesses_for_block(height)
    }

    fn block_count(&self) -> StoreResult<u64> {
        self.index.block_count()
    }

    fn all_blocks(&self) -> StoreResult<Vec<AuditBlock>> {
        self.index.all_blocks()
    }
}
